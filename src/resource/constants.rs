pub const DEFAULT_REGISTRY_NAME: &str = "[DEFAULT]";
