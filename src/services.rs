// Copyright 2019 Dmitry Tantsur <divius.inside@gmail.com>
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

//! OpenStack service types.

use std::fmt::Debug;

/// Trait representing a service type.
pub trait ServiceType: Debug {
    /// Service type to pass to the catalog.
    fn catalog_type(&self) -> &'static str;

    /// Service name as known to the cloud (used in logging and error messages).
    fn service_name(&self) -> &'static str;

    /// Short key used for endpoint overrides (e.g. `queues` for `queues_endpoint_override`).
    fn override_key(&self) -> &'static str;
}

/// A generic service.
#[derive(Copy, Clone, Debug)]
pub struct GenericService {
    catalog_type: &'static str,
    service_name: &'static str,
    override_key: &'static str,
}

impl GenericService {
    /// Create a new generic service.
    pub const fn new(
        catalog_type: &'static str,
        service_name: &'static str,
        override_key: &'static str,
    ) -> GenericService {
        GenericService {
            catalog_type,
            service_name,
            override_key,
        }
    }
}

impl ServiceType for GenericService {
    fn catalog_type(&self) -> &'static str {
        self.catalog_type
    }

    fn service_name(&self) -> &'static str {
        self.service_name
    }

    fn override_key(&self) -> &'static str {
        self.override_key
    }
}

/// Queues service (Rackspace Cloud Queues, OpenStack Marconi/Zaqar v1).
pub const QUEUES: GenericService = GenericService::new("rax:queues", "cloudQueues", "queues");

/// Image service.
pub const IMAGE: GenericService = GenericService::new("image", "cloudImages", "image");
