// Copyright 2018-2020 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Support for `OS_` environment variables.

use std::env;
use std::str::FromStr;

use log::debug;
use uuid::Uuid;

use crate::loading;
use crate::services::{GenericService, ServiceType, IMAGE, QUEUES};
use crate::{Error, ErrorKind, InterfaceType, NoAuth, Session, Token};

const ENDPOINT_OVERRIDES: [(&str, GenericService); 2] = [
    ("OS_QUEUES_ENDPOINT", QUEUES),
    ("OS_IMAGE_ENDPOINT", IMAGE),
];

// This is only used for unit testing.
trait Environment {
    fn get(&self, name: &'static str) -> Result<String, Error>;
}

#[derive(Debug, Clone, Copy)]
struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get(&self, name: &'static str) -> Result<String, Error> {
        env::var(name).map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Required environment variable {} is not provided", name),
            )
        })
    }
}

fn configure<E: Environment>(mut session: Session, env: &E) -> Result<Session, Error> {
    if let Ok(interface) = env.get("OS_INTERFACE") {
        session.set_endpoint_interface(InterfaceType::from_str(&interface)?);
    }

    if let Ok(region) = env.get("OS_REGION_NAME") {
        session.set_region(region);
    }

    for (var, service) in ENDPOINT_OVERRIDES {
        if let Ok(value) = env.get(var) {
            let url = loading::parse_override(var, &value)?;
            debug!("Using {} for {} from {}", url, service.service_name(), var);
            let _ = session
                .endpoint_overrides_mut()
                .insert(service.override_key().to_string(), url);
        }
    }

    Ok(session)
}

#[inline]
fn _from_env<E: Environment>(env: E) -> Result<Session, Error> {
    if let Ok(cloud_name) = env.get("OS_CLOUD") {
        return loading::from_config(cloud_name);
    }

    let auth_type = env.get("OS_AUTH_TYPE").unwrap_or_else(|_| {
        if env.get("OS_TOKEN").is_ok() {
            "token".to_string()
        } else {
            "none".to_string()
        }
    });

    let client = loading::get_client(env.get("OS_CACERT").ok())?;
    let endpoint = env.get("OS_ENDPOINT").ok();

    let session = match auth_type.as_str() {
        "none" => {
            let auth = match endpoint {
                Some(endpoint) => NoAuth::new(endpoint)?,
                None => NoAuth::new_without_endpoint(),
            };
            Session::new_with_client(client, auth)
        }
        "token" => {
            let mut auth = Token::new(env.get("OS_TOKEN")?);
            if let Some(endpoint) = endpoint {
                auth = auth.with_endpoint(endpoint)?;
            }
            Session::new_with_client(client, auth)
        }
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Unsupported authentication type: {}", auth_type),
            ))
        }
    };

    configure(session, &env)
}

/// Create a `Session` from environment variables.
///
/// If `OS_CLOUD` is set, the session is loaded from `clouds.yaml` instead. Otherwise
/// supported authentication types (`OS_AUTH_TYPE`) are `token` (the default when
/// `OS_TOKEN` is set) and `none`. `OS_ENDPOINT` is used for all services unless
/// `OS_QUEUES_ENDPOINT` or `OS_IMAGE_ENDPOINT` override it.
pub fn from_env() -> Result<Session, Error> {
    _from_env(RealEnvironment)
}

fn _queues_client_id<E: Environment>(env: E) -> Result<Option<Uuid>, Error> {
    match env.get("OS_QUEUES_CLIENT_ID") {
        Ok(value) => Uuid::parse_str(&value).map(Some).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("OS_QUEUES_CLIENT_ID is not a valid UUID: {}", e),
            )
        }),
        Err(_) => Ok(None),
    }
}

/// Client ID for the Queues service from `OS_QUEUES_CLIENT_ID`, if set.
pub(crate) fn queues_client_id() -> Result<Option<Uuid>, Error> {
    _queues_client_id(RealEnvironment)
}

#[cfg(test)]
pub mod test {
    use std::collections::HashMap;

    use maplit::hashmap;
    use uuid::Uuid;

    use super::{Environment, _from_env, _queues_client_id};
    use crate::services::{IMAGE, QUEUES};
    use crate::{Error, ErrorKind, InterfaceType};

    impl Environment for HashMap<&'static str, &'static str> {
        fn get(&self, name: &'static str) -> Result<String, Error> {
            self.get(name)
                .cloned()
                .map(From::from)
                .ok_or_else(|| Error::new(ErrorKind::InvalidInput, name))
        }
    }

    #[tokio::test]
    async fn test_none() {
        let env = hashmap! {
            "OS_AUTH_TYPE" => "none",
            "OS_ENDPOINT" => "http://example.com/v1/1234",
        };

        let session = _from_env(env).unwrap();
        let root = session.get_root(QUEUES).await.unwrap();
        assert_eq!(root.as_str(), "http://example.com/v1/1234/");
    }

    #[tokio::test]
    async fn test_none_is_default() {
        let env = hashmap! {
            "OS_QUEUES_ENDPOINT" => "http://queues.example.com/v1",
        };

        let session = _from_env(env).unwrap();
        let root = session.get_root(QUEUES).await.unwrap();
        assert_eq!(root.as_str(), "http://queues.example.com/v1/");
        let err = session.get_root(IMAGE).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::EndpointNotFound);
    }

    #[test]
    fn test_token() {
        let env = hashmap! {
            "OS_TOKEN" => "abcdef",
            "OS_ENDPOINT" => "https://dfw.queues.api.rackspacecloud.com/v1/123456",
            "OS_INTERFACE" => "internalURL",
            "OS_REGION_NAME" => "DFW",
        };

        let session = _from_env(env).unwrap();
        assert_eq!(session.endpoint_filters().interface, InterfaceType::Internal);
        assert_eq!(session.endpoint_filters().region.as_deref(), Some("DFW"));
        assert!(!format!("{:?}", session.auth_type()).contains("abcdef"));
    }

    #[test]
    fn test_token_missing() {
        let env = hashmap! {
            "OS_AUTH_TYPE" => "token",
            "OS_ENDPOINT" => "http://example.com",
        };

        let err = _from_env(env).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_overrides() {
        let env = hashmap! {
            "OS_TOKEN" => "abcdef",
            "OS_QUEUES_ENDPOINT" => "http://queues.example.com/v1",
            "OS_IMAGE_ENDPOINT" => "http://image.example.com/v2",
        };

        let session = _from_env(env).unwrap();
        let overrides = session.endpoint_overrides();
        assert_eq!(
            overrides.get("queues").unwrap().as_str(),
            "http://queues.example.com/v1"
        );
        assert_eq!(
            overrides.get("image").unwrap().as_str(),
            "http://image.example.com/v2"
        );
    }

    #[test]
    fn test_invalid_override() {
        let env = hashmap! {
            "OS_QUEUES_ENDPOINT" => "not a url",
        };

        let err = _from_env(env).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_unsupported() {
        let env = hashmap! {
            "OS_AUTH_TYPE" => "password",
        };

        let err = _from_env(env).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_invalid_interface() {
        let env = hashmap! {
            "OS_INTERFACE" => "private",
        };

        let err = _from_env(env).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_client_id() {
        let env: HashMap<&'static str, &'static str> = HashMap::new();
        assert!(_queues_client_id(env).unwrap().is_none());

        let env = hashmap! {
            "OS_QUEUES_CLIENT_ID" => "3381af92-2b9e-11e3-b191-71861300734c",
        };
        assert_eq!(
            _queues_client_id(env).unwrap(),
            Some(Uuid::parse_str("3381af92-2b9e-11e3-b191-71861300734c").unwrap())
        );

        let env = hashmap! {
            "OS_QUEUES_CLIENT_ID" => "client-1",
        };
        assert_eq!(
            _queues_client_id(env).err().unwrap().kind(),
            ErrorKind::InvalidInput
        );
    }
}
