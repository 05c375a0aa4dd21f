// Copyright 2025 eraflo
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

//! Importer selection and invocation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use vesta_core::resource::{
    ImportedResource, ResourceData, ResourceDataProvider, ResourceError, ResourceImporter,
    ResourceKey, ResourceOperation, ResourceResult, TypeSupport,
};

/// Picks the importer for `data`.
///
/// Only importers that accept the format key for import and support the type
/// at all are considered. The first one reporting exact sub-type support wins;
/// otherwise the first one supporting the type generically.
pub(crate) fn select_importer(
    importers: &[Arc<dyn ResourceImporter>],
    data: &ResourceData,
) -> Option<Arc<dyn ResourceImporter>> {
    let mut generic = None;
    for importer in importers {
        if !importer.is_format_key_supported(&data.format_key, ResourceOperation::Import) {
            continue;
        }
        match importer.is_resource_type_supported(data.resource_type, data.sub_type) {
            TypeSupport::SubType => return Some(Arc::clone(importer)),
            TypeSupport::Type if generic.is_none() => generic = Some(Arc::clone(importer)),
            TypeSupport::Type | TypeSupport::None => {}
        }
    }
    generic
}

/// Looks up the metadata of `key` and runs the matching importer on the
/// calling thread. A panicking importer is reported as an error.
pub(crate) fn import(
    provider: &dyn ResourceDataProvider,
    importers: &[Arc<dyn ResourceImporter>],
    key: &ResourceKey,
) -> ResourceResult<ImportedResource> {
    let data = provider
        .resource_data(key)
        .ok_or_else(|| ResourceError::NotFound(key.clone()))?;
    let importer =
        select_importer(importers, &data).ok_or_else(|| ResourceError::NoImporter {
            key: key.clone(),
            format_key: data.format_key.clone(),
            resource_type: data.resource_type,
            sub_type: data.sub_type,
        })?;

    log::debug!("Importing '{key}' with importer '{}'.", importer.name());
    match panic::catch_unwind(AssertUnwindSafe(|| importer.import_resource_data(&data))) {
        Ok(Ok(resource)) => Ok(resource),
        Ok(Err(source)) => Err(ResourceError::ImportFailed {
            key: key.clone(),
            importer: importer.name().to_string(),
            source,
        }),
        Err(payload) => Err(ResourceError::ImporterPanicked {
            key: key.clone(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
