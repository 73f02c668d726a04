use super::*;
use crate::BackendConfig;
use crate::BackendError;

#[test]
fn defaults_include_counter() {
    let provider = BuiltinProvider::with_defaults();
    assert_eq!(provider.type_names(), vec![COUNTER_TYPE.to_string()]);
}

#[test]
fn restrict_to_empty_list_keeps_everything() {
    let provider = BuiltinProvider::with_defaults().restrict_to(&[]);
    assert!(provider.create(COUNTER_TYPE).is_ok());
}

#[test]
fn restrict_to_hides_disabled_types() {
    let mut provider = BuiltinProvider::with_defaults();
    provider.register("blank", || Box::new(ViewModel::builder("blank").build()));

    let provider = provider.restrict_to(&["blank".to_string()]);

    assert_eq!(provider.type_names(), vec!["blank".to_string()]);
    assert!(matches!(
        provider.create(COUNTER_TYPE),
        Err(BackendError::UnknownType(_))
    ));
}

#[test]
fn configured_loader_builds_builtin_provider() {
    let loader = ConfiguredLoader::new(BackendConfig::default());
    let provider = loader.initialize().unwrap();
    assert!(provider.type_names().contains(&COUNTER_TYPE.to_string()));
}

#[test]
fn configured_loader_rejects_unknown_provider() {
    let loader = ConfiguredLoader::new(BackendConfig {
        provider: "native-v2".into(),
        ..Default::default()
    });
    assert!(matches!(loader.initialize(), Err(BackendError::InitFailed(_))));
}

#[test]
fn configured_loader_fails_when_nothing_is_enabled() {
    let loader = ConfiguredLoader::new(BackendConfig {
        enabled_types: vec!["gauge".into()],
        ..Default::default()
    });
    assert!(matches!(loader.initialize(), Err(BackendError::InitFailed(_))));
}
