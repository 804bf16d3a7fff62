//! Input validation shared by the engine and the HTTP layer.
//!
//! Validation is centralized here so every backend and every entry point
//! (REST, future gRPC) rejects the same inputs the same way.

use std::sync::OnceLock;

use regex::Regex;

use cloudpam_cidr::{Cidr, is_reserved};

use crate::error::{Error, Result};
use crate::model::Provider;

pub const MIN_PREFIX_LEN: u8 = 8;
pub const MAX_PREFIX_LEN: u8 = 30;
pub const MAX_NAME_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 12;
pub const MAX_PASSWORD_LEN: usize = 72;

fn gcp_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap())
}

fn azure_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

fn onprem_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]{0,62}[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap())
}

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^cpam_v1_[A-Za-z0-9]{8}_[A-Za-z0-9]{24,}$").unwrap())
}

/// Validates a human-facing name: non-empty, bounded, no control characters.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::validation("name must not contain control characters"));
    }
    Ok(())
}

/// Parses and validates a pool CIDR: IPv4, canonical, prefix length in
/// `[MIN_PREFIX_LEN, MAX_PREFIX_LEN]`, and not a reserved range.
pub fn validate_pool_cidr(raw: &str) -> Result<Cidr> {
    let cidr = Cidr::parse(raw, false)?;
    if cidr.prefix_len() < MIN_PREFIX_LEN || cidr.prefix_len() > MAX_PREFIX_LEN {
        return Err(Error::validation(format!(
            "prefix length must be between {MIN_PREFIX_LEN} and {MAX_PREFIX_LEN}"
        )));
    }
    if is_reserved(&cidr) {
        return Err(Error::validation(format!("{cidr} falls within a reserved range")));
    }
    Ok(cidr)
}

/// Validates `provider:id` against the provider-specific id format.
pub fn validate_account_key(provider: Provider, id: &str) -> Result<()> {
    let ok = match provider {
        Provider::Aws => id.len() == 12 && id.bytes().all(|b| b.is_ascii_digit()),
        Provider::Gcp => gcp_key_re().is_match(id),
        Provider::Azure => azure_key_re().is_match(id),
        Provider::Onprem => onprem_key_re().is_match(id),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "invalid account id `{id}` for provider `{}`",
            provider.as_key_prefix()
        )))
    }
}

/// Splits and validates a full `provider:id` account key, returning the
/// parsed provider.
pub fn validate_full_account_key(key: &str) -> Result<(Provider, String)> {
    let (prefix, id) = key
        .split_once(':')
        .ok_or_else(|| Error::validation("account key must be of the form `provider:id`"))?;
    let provider = match prefix {
        "aws" => Provider::Aws,
        "gcp" => Provider::Gcp,
        "azure" => Provider::Azure,
        "onprem" => Provider::Onprem,
        other => {
            return Err(Error::validation(format!("unknown account provider `{other}`")));
        }
    };
    validate_account_key(provider, id)?;
    Ok((provider, id.to_owned()))
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN || len > MAX_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validates the externally-visible shape of an API key
/// (`cpam_v1_<prefix>_<secret>`), independent of whether it actually exists.
pub fn validate_api_key_format(key: &str) -> Result<()> {
    if api_key_re().is_match(key) {
        Ok(())
    } else {
        Err(Error::validation("malformed API key"))
    }
}

/// Splits a well-formed API key into its lookup prefix and secret.
pub fn split_api_key(key: &str) -> Result<(&str, &str)> {
    validate_api_key_format(key)?;
    let rest = key.strip_prefix("cpam_v1_").expect("format validated above");
    rest.split_once('_')
        .ok_or_else(|| Error::validation("malformed API key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_cidr_in_range() {
        assert!(validate_pool_cidr("10.0.0.0/16").is_ok());
    }

    #[test]
    fn rejects_prefix_out_of_range() {
        assert!(validate_pool_cidr("10.0.0.0/4").is_err());
        assert!(validate_pool_cidr("10.0.0.0/31").is_err());
    }

    #[test]
    fn rejects_reserved_range() {
        assert!(validate_pool_cidr("127.0.0.0/8").is_err());
    }

    #[test]
    fn aws_key_requires_twelve_digits() {
        assert!(validate_account_key(Provider::Aws, "123456789012").is_ok());
        assert!(validate_account_key(Provider::Aws, "12345").is_err());
        assert!(validate_account_key(Provider::Aws, "12345678901a").is_err());
    }

    #[test]
    fn azure_key_requires_uuid_form() {
        assert!(
            validate_account_key(Provider::Azure, "12345678-1234-1234-1234-123456789012").is_ok()
        );
        assert!(validate_account_key(Provider::Azure, "not-a-uuid").is_err());
    }

    #[test]
    fn full_account_key_round_trips() {
        let (provider, id) = validate_full_account_key("aws:123456789012").unwrap();
        assert_eq!(provider, Provider::Aws);
        assert_eq!(id, "123456789012");
    }

    #[test]
    fn api_key_format_matches_spec_shape() {
        assert!(validate_api_key_format("cpam_v1_ab3dEfGh_abcdefghijklmnopqrstuvwx").is_ok());
        assert!(validate_api_key_format("cpam_v1_short_x").is_err());
    }

    #[test]
    fn split_api_key_separates_prefix_and_secret() {
        let (prefix, secret) = split_api_key("cpam_v1_ab3dEfGh_abcdefghijklmnopqrstuvwx").unwrap();
        assert_eq!(prefix, "ab3dEfGh");
        assert_eq!(secret, "abcdefghijklmnopqrstuvwx");
    }
}
