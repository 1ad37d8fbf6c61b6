//! Cross-field option rules.
//!
//! Setting a single option may rewrite its neighbours: Host, Port and
//! CertPath are kept consistent with each other, and staging keys are
//! normalised to 32 characters.

use md5::{Digest, Md5};
use tracing::{debug, warn};

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_entity::listener::ListenerOptions;
use picket_entity::listener::options::{CERT_PATH, HOST, PORT, STAGING_KEY};

use crate::catalog::PluginCatalog;

/// Required length of a staging key.
pub const STAGING_KEY_LEN: usize = 32;

const HTTP: Protocol = Protocol {
    scheme: "http",
    default_port: "80",
};

const HTTPS: Protocol = Protocol {
    scheme: "https",
    default_port: "443",
};

#[derive(Debug, Clone, Copy)]
struct Protocol {
    scheme: &'static str,
    default_port: &'static str,
}

/// Applies option assignments to live option sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionResolver;

impl OptionResolver {
    /// Set one option on one option set, applying the dependent-field rules.
    ///
    /// Errors leave `options` untouched.
    pub fn set_option(options: &mut ListenerOptions, option: &str, raw: &str) -> AppResult<()> {
        if !options.contains(option) {
            return Err(AppError::invalid_option(format!(
                "Unknown option '{option}'"
            )));
        }

        match option {
            HOST => set_host(options, raw)?,
            CERT_PATH => set_cert_path(options, raw),
            PORT => set_port(options, raw)?,
            STAGING_KEY => set_staging_key(options, raw),
            _ => options.set_value(option, raw),
        }

        debug!(option = %option, value = %options.value(option), "Option set");
        Ok(())
    }

    /// Set one option on every loaded module that declares it.
    ///
    /// Returns the number of modules updated.
    pub fn set_option_all(catalog: &mut PluginCatalog, option: &str, raw: &str) -> AppResult<usize> {
        let mut updated = 0;
        for definition in catalog.definitions_mut() {
            if !definition.options.contains(option) {
                continue;
            }
            Self::set_option(&mut definition.options, option, raw)?;
            updated += 1;
        }

        if updated == 0 {
            return Err(AppError::invalid_option(format!(
                "No loaded module declares option '{option}'"
            )));
        }
        Ok(updated)
    }
}

fn set_host(options: &mut ListenerOptions, raw: &str) -> AppResult<()> {
    let raw = raw.trim();
    let (protocol, remainder) = if let Some(rest) = raw.strip_prefix("https://") {
        (HTTPS, rest)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        (HTTP, rest)
    } else if options.value(CERT_PATH).is_empty() {
        (HTTP, raw)
    } else {
        (HTTPS, raw)
    };

    let remainder = remainder.trim();
    if remainder.is_empty() {
        return Err(AppError::invalid_option("Host must not be empty"));
    }

    let segments: Vec<&str> = remainder.split(':').collect();
    let explicit_port = match segments.as_slice() {
        [_, .., last] if is_digits(last) => Some(*last),
        _ => None,
    };

    let scheme = protocol.scheme;
    if let Some(port) = explicit_port {
        options.set_value(HOST, format!("{scheme}://{remainder}"));
        options.set_value(PORT, port);
    } else {
        let port = options.value(PORT).to_string();
        if port.is_empty() {
            options.set_value(HOST, format!("{scheme}://{remainder}"));
            options.set_value(PORT, protocol.default_port);
        } else {
            options.set_value(HOST, format!("{scheme}://{remainder}:{port}"));
        }
    }
    Ok(())
}

fn set_cert_path(options: &mut ListenerOptions, raw: &str) {
    options.set_value(CERT_PATH, raw);
    if raw.is_empty() {
        return;
    }
    if let Some(rest) = options.value(HOST).strip_prefix("http:") {
        let host = format!("https:{rest}");
        options.set_value(HOST, host);
    }
}

fn set_port(options: &mut ListenerOptions, raw: &str) -> AppResult<()> {
    let port = raw.trim();
    if !port.is_empty() && port.parse::<u16>().is_err() {
        return Err(AppError::invalid_option(format!(
            "'{raw}' is not a valid port"
        )));
    }

    options.set_value(PORT, port);
    if port.is_empty() {
        return Ok(());
    }

    let host = options.value(HOST);
    if host.contains("://") {
        let segments: Vec<&str> = host.split(':').collect();
        if let [scheme, address] | [scheme, address, _] = segments.as_slice() {
            let host = format!("{scheme}:{address}:{port}");
            options.set_value(HOST, host);
        }
    }
    Ok(())
}

fn set_staging_key(options: &mut ListenerOptions, raw: &str) {
    let key = raw.trim();
    if key.chars().count() == STAGING_KEY_LEN {
        options.set_value(STAGING_KEY, key);
        return;
    }

    warn!(
        length = key.chars().count(),
        "Staging key is not {STAGING_KEY_LEN} characters; using its MD5 digest"
    );
    options.set_value(STAGING_KEY, hex::encode(Md5::digest(key.as_bytes())));
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
