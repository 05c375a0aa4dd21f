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

// Vesta Sandbox
// Loads the resources listed in a RON manifest through the resource service.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use vesta_core::resource::{
    ImportedResource, ResourceData, ResourceImporter, ResourceIndex, ResourceKey,
    ResourceLocation, ResourceOperation, ResourceType, TypeSupport, DEFAULT_SUB_TYPE,
};
use vesta_resources::{
    ResourceHandleFactory, ResourceService, ResourceServiceConfig, UntypedResourceHandle,
};

/// The sandbox manifest.
#[derive(Debug, Deserialize)]
struct SandboxConfig {
    #[serde(default)]
    service: ResourceServiceConfig,
    asset_root: PathBuf,
    resources: Vec<ResourceData>,
}

impl SandboxConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = ron::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if config.asset_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.asset_root = dir.join(&config.asset_root);
            }
        }
        Ok(config)
    }
}

/// Reads plain-text files below an asset root.
struct TextImporter {
    root: PathBuf,
}

impl ResourceImporter for TextImporter {
    fn name(&self) -> &str {
        "text"
    }

    fn is_format_key_supported(&self, format_key: &str, operation: ResourceOperation) -> bool {
        operation == ResourceOperation::Import && matches!(format_key, "txt" | "md")
    }

    fn is_resource_type_supported(
        &self,
        resource_type: ResourceType,
        sub_type: i32,
    ) -> TypeSupport {
        match (resource_type, sub_type) {
            (ResourceType::Text, DEFAULT_SUB_TYPE) => TypeSupport::SubType,
            (ResourceType::Text, _) => TypeSupport::Type,
            _ => TypeSupport::None,
        }
    }

    fn import_resource_data(
        &self,
        data: &ResourceData,
    ) -> Result<ImportedResource, Box<dyn Error + Send + Sync>> {
        let ResourceLocation::Path(path) = &data.location else {
            return Err("the text importer only reads loose files".into());
        };
        let text = std::fs::read_to_string(self.root.join(path))?;
        Ok(Box::new(text))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let manifest = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("sandbox.ron"));
    let config = SandboxConfig::load(&manifest)?;

    let factory = ResourceHandleFactory::new();
    factory.register::<String>(ResourceType::Text, DEFAULT_SUB_TYPE);

    let index = Arc::new(ResourceIndex::from_entries(config.resources));
    let service = ResourceService::new(config.service, index, factory);
    service.register_importer(Arc::new(TextImporter {
        root: config.asset_root,
    }));
    log::info!("Discovered {} resources.", service.discover_all());
    service
        .start()
        .context("failed to start the resource loader thread")?;

    // Immediate: imported on this thread.
    let readme = ResourceKey::new("docs/readme");
    match service.get_or_load_immediately::<String>(&readme) {
        Some(text) => log::info!("'{readme}' loaded inline ({} bytes).", text.len()),
        None => log::warn!("'{readme}' could not be loaded."),
    }

    // Queued: handed to the loader thread, lowest priority value first.
    let outro = ResourceKey::new("levels/outro");
    let intro = ResourceKey::new("levels/intro");
    service.load_with_priority(&outro, 20);
    service.load_with_priority(&intro, 10);
    let queued = service.load_async(&outro);
    match queued.wait_timeout(Duration::from_secs(2)) {
        Some(loaded) => log::info!("'{outro}' finished loading: {loaded}."),
        None => log::warn!("'{outro}' is still loading."),
    }

    // Awaited: the task suspends until the import has finished.
    let secret = ResourceKey::new("levels/secret");
    if !service.load_async(&secret).await {
        let state = service
            .get_handle(&secret)
            .map(|handle| handle.loading_state());
        log::warn!("'{secret}' failed to load (state: {state:?}).");
    }
    if let Some(handle) = service.get_typed::<String>(&intro) {
        if handle.load_async().await {
            log::info!("'{intro}' says: {}", handle.resource().unwrap_or_default().trim());
        }
    }

    log::info!("{:?}", service.stats());
    service.shutdown();
    Ok(())
}
