// Copyright 2018-2021 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Support for cloud configuration file.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};
use serde::Deserialize;

use crate::loading;
use crate::utils;
use crate::{Error, ErrorKind, InterfaceType, NoAuth, Session, Token};

const OVERRIDE_SUFFIX: &str = "_endpoint_override";

#[derive(Debug, Deserialize)]
struct Auth {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cloud {
    #[serde(default)]
    auth: Option<Auth>,
    #[serde(default)]
    auth_type: Option<String>,
    #[serde(default)]
    cacert: Option<String>,
    #[serde(default)]
    interface: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(flatten)]
    options: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    #[serde(flatten)]
    clouds: HashMap<String, Cloud>,
}

#[derive(Debug, Deserialize)]
struct Root {
    clouds: Clouds,
}

fn section<'a>(
    root: &'a mut serde_yaml::Mapping,
    key: &str,
    file: &str,
) -> Result<&'a mut serde_yaml::Mapping, Error> {
    match root.get_mut(key) {
        Some(serde_yaml::Value::Mapping(map)) => Ok(map),
        Some(other) => Err(Error::new(
            ErrorKind::InvalidConfig,
            format!("{} object in {} must be a mapping, got {:?}", key, file, other),
        )),
        None => Err(Error::new(
            ErrorKind::InvalidConfig,
            format!("{} must contain a {} object", file, key),
        )),
    }
}

/// Fill in cloud records from the `public-clouds` profiles they reference.
///
/// Keys already present in a cloud record take precedence over the profile.
fn inject_profiles(
    clouds_public: &mut serde_yaml::Mapping,
    clouds: &mut serde_yaml::Mapping,
) -> Result<(), Error> {
    let profiles = section(clouds_public, "public-clouds", "clouds-public.yaml")?;
    let records = section(clouds, "clouds", "clouds.yaml")?;

    for (cloud_name, cloud) in records.iter_mut() {
        let cloud = match cloud.as_mapping_mut() {
            Some(cloud) => cloud,
            None => {
                warn!("Cloud record {:?} is not a mapping, ignoring", cloud_name);
                continue;
            }
        };

        let profile_name = match cloud.get("profile") {
            Some(serde_yaml::Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    format!("Profile name {:?} is not a string", other),
                ))
            }
            None => continue,
        };

        match profiles.get(profile_name.as_str()) {
            Some(serde_yaml::Value::Mapping(profile)) => {
                utils::merge_mappings(profile.clone(), cloud, false)
            }
            Some(_) => warn!("Profile {} is not a mapping, ignoring", profile_name),
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidConfig,
                    format!("Missing profile {} in clouds-public.yaml", profile_name),
                ))
            }
        }
    }

    Ok(())
}

/// Look for a configuration file in the current directory, the user configuration directory
/// and `/etc/openstack`, in this order.
fn find_config(filename: &str) -> Option<PathBuf> {
    let current = Path::new(filename);
    if current.is_file() {
        match current.canonicalize() {
            Ok(val) => return Some(val),
            Err(e) => warn!("Cannot canonicalize {:?}: {}", current, e),
        }
    }

    match dirs::home_dir() {
        Some(home) => {
            let user = home.join(".config/openstack").join(filename);
            if user.is_file() {
                return Some(user);
            }
        }
        None => warn!("Cannot find home directory"),
    }

    let system = Path::new("/etc/openstack").join(filename);
    if system.is_file() {
        Some(system)
    } else {
        None
    }
}

#[inline]
fn empty_root(key: &str) -> serde_yaml::Mapping {
    let mut result = serde_yaml::Mapping::with_capacity(1);
    let _ = result.insert(
        key.into(),
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
    );
    result
}

fn read_yaml(filename: &str, default_root_key: Option<&str>) -> Result<serde_yaml::Mapping, Error> {
    let path = match (find_config(filename), default_root_key) {
        (Some(path), _) => path,
        (None, Some(default)) => return Ok(empty_root(default)),
        (None, None) => {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("{} was not found in any location", filename),
            ))
        }
    };

    debug!("Reading {} from {}", filename, path.display());
    let content = File::open(&path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot read {}: {}", path.display(), e),
        )
    })?;

    let value: serde_yaml::Value = serde_yaml::from_reader(content).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot parse {}: {}", path.display(), e),
        )
    })?;
    match value {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        other => Err(Error::new(
            ErrorKind::InvalidConfig,
            format!("Root of {} is {:?}, not a mapping", filename, other),
        )),
    }
}

fn add_endpoint_override(session: &mut Session, key: &str, value: &str) -> Result<(), Error> {
    let service = key.trim_end_matches(OVERRIDE_SUFFIX);
    let url = loading::parse_override(key, value)?;
    debug!("Using {} for service {} from {}", url, service, key);
    let _ = session
        .endpoint_overrides_mut()
        .insert(service.to_string(), url);
    Ok(())
}

fn configure(
    mut session: Session,
    interface: Option<String>,
    region_name: Option<String>,
    options: HashMap<String, serde_yaml::Value>,
) -> Result<Session, Error> {
    if let Some(interface) = interface {
        let interface = InterfaceType::from_str(&interface)
            .map_err(|e| Error::new(ErrorKind::InvalidConfig, e.message()))?;
        session.set_endpoint_interface(interface);
    }

    if let Some(region) = region_name {
        session.set_region(region);
    }

    for (key, value) in options {
        if !key.ends_with(OVERRIDE_SUFFIX) {
            continue;
        }

        if let serde_yaml::Value::String(value) = value {
            add_endpoint_override(&mut session, &key, &value)?;
        } else {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("{} must be a string, got {:?}", key, value),
            ));
        }
    }

    Ok(session)
}

fn none_auth_from_cloud(auth: Option<Auth>) -> Result<NoAuth, Error> {
    match auth.and_then(|auth| auth.endpoint) {
        Some(endpoint) => NoAuth::new(endpoint)
            .map_err(|e| Error::new(ErrorKind::InvalidConfig, e.message())),
        None => Ok(NoAuth::new_without_endpoint()),
    }
}

fn token_auth_from_cloud(auth: Option<Auth>) -> Result<Token, Error> {
    let auth = auth.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            "token authentication requires 'auth' object",
        )
    })?;
    let token = auth.token.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            "token authentication requires a token",
        )
    })?;

    let result = Token::new(token);
    match auth.endpoint {
        Some(endpoint) => result
            .with_endpoint(endpoint)
            .map_err(|e| Error::new(ErrorKind::InvalidConfig, e.message())),
        None => Ok(result),
    }
}

fn from_files(
    name: &str,
    mut clouds: serde_yaml::Mapping,
    mut clouds_public: serde_yaml::Mapping,
    secure: serde_yaml::Mapping,
) -> Result<Session, Error> {
    utils::merge_mappings(secure, &mut clouds, true);

    inject_profiles(&mut clouds_public, &mut clouds)?;

    let mut clouds_root: Root = serde_yaml::from_value(serde_yaml::Value::Mapping(clouds))
        .map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("Cannot parse the merged cloud configuration: {}", e),
            )
        })?;

    let cloud =
        clouds_root.clouds.clouds.remove(name).ok_or_else(|| {
            Error::new(ErrorKind::InvalidConfig, format!("No such cloud: {}", name))
        })?;

    let has_token = cloud
        .auth
        .as_ref()
        .map(|auth| auth.token.is_some())
        .unwrap_or(false);
    let auth_type = cloud.auth_type.unwrap_or_else(|| {
        if has_token { "token" } else { "none" }.to_string()
    });

    let client = loading::get_client(cloud.cacert)?;

    let session = match auth_type.as_str() {
        "none" => Session::new_with_client(client, none_auth_from_cloud(cloud.auth)?),
        "token" => Session::new_with_client(client, token_auth_from_cloud(cloud.auth)?),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("Unsupported authentication type: {}", auth_type),
            ))
        }
    };

    configure(session, cloud.interface, cloud.region_name, cloud.options)
}

/// Create a `Session` from a `clouds.yaml` configuration file.
pub fn from_config<S: AsRef<str>>(cloud_name: S) -> Result<Session, Error> {
    let clouds = read_yaml("clouds.yaml", None)?;
    let clouds_public = read_yaml("clouds-public.yaml", Some("public-clouds"))?;
    let secure = read_yaml("secure.yaml", Some("clouds"))?;

    from_files(cloud_name.as_ref(), clouds, clouds_public, secure)
}
