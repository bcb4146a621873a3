//! Backend option string parsing tests.

use framepump::{BackendOptions, PumpError};

fn pairs(options: &BackendOptions) -> Vec<(&str, &str)> {
    options.iter().collect()
}

#[test]
fn empty_string_yields_no_options() {
    let options = BackendOptions::parse("").unwrap();
    assert!(options.is_empty());
    assert_eq!(options.len(), 0);
}

#[test]
fn pairs_keep_their_order() {
    let options = BackendOptions::parse("preset=slow:crf=18:tune=film").unwrap();
    assert_eq!(
        pairs(&options),
        vec![("preset", "slow"), ("crf", "18"), ("tune", "film")]
    );
}

#[test]
fn escapes_and_quotes_protect_separators() {
    let options = BackendOptions::parse(r"vf=scale\:640:title='a:b=c'").unwrap();
    assert_eq!(options.get("vf"), Some("scale:640"));
    assert_eq!(options.get("title"), Some("a:b=c"));
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let options = BackendOptions::parse(" crf = 18 : preset=' slow '").unwrap();
    assert_eq!(options.get("crf"), Some("18"));
    assert_eq!(options.get("preset"), Some(" slow "));
}

#[test]
fn trailing_separator_is_allowed() {
    let options = BackendOptions::parse("crf=18:").unwrap();
    assert_eq!(pairs(&options), vec![("crf", "18")]);
}

#[test]
fn repeated_keys_keep_the_last_value() {
    let options = BackendOptions::parse("crf=18:preset=fast:crf=23").unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options.get("crf"), Some("23"));
    assert_eq!(options.get("preset"), Some("fast"));
}

#[test]
fn doubled_separator_is_accepted() {
    let options = BackendOptions::parse("a=1::b=2").unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options.get("a"), Some("1"));
}

#[test]
fn nul_byte_is_rejected() {
    assert!(matches!(
        BackendOptions::parse("crf=1\08"),
        Err(PumpError::InvalidOptions(_))
    ));
}

#[test]
fn empty_values_are_kept() {
    let options = BackendOptions::parse("flags=").unwrap();
    assert_eq!(options.get("flags"), Some(""));
}

#[test]
fn missing_equals_is_rejected() {
    assert!(matches!(
        BackendOptions::parse("crf"),
        Err(PumpError::InvalidOptions(_))
    ));
    assert!(matches!(
        BackendOptions::parse("crf=18:preset"),
        Err(PumpError::InvalidOptions(_))
    ));
}

#[test]
fn empty_key_is_rejected() {
    assert!(matches!(
        BackendOptions::parse("=18"),
        Err(PumpError::InvalidOptions(_))
    ));
}

#[test]
fn builder_replaces_existing_keys() {
    let options = BackendOptions::new()
        .with("crf", "18")
        .with("preset", "fast")
        .with("crf", "23");
    assert_eq!(pairs(&options), vec![("crf", "23"), ("preset", "fast")]);
}
