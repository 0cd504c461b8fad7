use school_backend::util::password::*;

// (password, meets strength rules)
fn strength_cases() -> Vec<(&'static str, bool)> {
    vec![
        ("Passw0rd!", true),
        ("Hillside#2024", true),
        ("Ünïcödé1!", true),
        ("weak", false),
        ("nouppercase123!", false),
        ("NOLOWERCASE123!", false),
        ("NoDigitsHere!", false),
        ("NoSpecialChars123", false),
        ("Sh0rt!", false),
        ("", false),
    ]
}

#[test]
fn test_hash_and_verify() {
    let hash = PasswordUtilsImpl::hash_password("Passw0rd!").unwrap();

    assert!(hash.starts_with("$argon2id$"));
    assert_ne!(hash, "Passw0rd!");
    assert!(PasswordUtilsImpl::verify_password("Passw0rd!", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("passw0rd!", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("", &hash).unwrap());
}

#[test]
fn test_hash_is_salted() {
    let first = PasswordUtilsImpl::hash_password("Passw0rd!").unwrap();
    let second = PasswordUtilsImpl::hash_password("Passw0rd!").unwrap();

    assert_ne!(first, second);
    assert!(PasswordUtilsImpl::verify_password("Passw0rd!", &first).unwrap());
    assert!(PasswordUtilsImpl::verify_password("Passw0rd!", &second).unwrap());
}

#[test]
fn test_unicode_password_round_trip() {
    let hash = PasswordUtilsImpl::hash_password("Mötley Crüe 1!").unwrap();
    assert!(PasswordUtilsImpl::verify_password("Mötley Crüe 1!", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("Motley Crue 1!", &hash).unwrap());
}

#[test]
fn test_verify_rejects_malformed_hash() {
    for hash in ["", "plaintext", "argon2id-without-dollar"] {
        assert!(
            matches!(PasswordUtilsImpl::verify_password("Passw0rd!", hash), Err(PasswordError::InvalidHashFormat)),
            "accepted {:?}",
            hash
        );
    }
}

#[test]
fn test_strength_table() {
    for (password, valid) in strength_cases() {
        assert_eq!(
            PasswordUtilsImpl::validate_password_strength(password).is_ok(),
            valid,
            "unexpected verdict for {:?}",
            password
        );
    }
}

#[test]
fn test_strength_reports_every_problem() {
    let errors = PasswordUtilsImpl::validate_password_strength("abc").unwrap_err();

    assert_eq!(errors.len(), 4);
    assert!(errors.contains(&"Password must be at least 8 characters long".to_string()));
    assert!(errors.contains(&"Password must contain at least one uppercase letter".to_string()));
    assert!(errors.contains(&"Password must contain at least one digit".to_string()));
    assert!(errors.contains(&"Password must contain at least one special character".to_string()));
}

#[test]
fn test_every_special_character_counts() {
    for special in "!@#$%^&*()_+-=[]{}|;:,.<>?".chars() {
        let password = format!("Abcdefg1{}", special);
        assert!(PasswordUtilsImpl::validate_password_strength(&password).is_ok(), "rejected {:?}", password);
    }
}
