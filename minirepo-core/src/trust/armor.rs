//! ASCII armor for keys and detached signatures
//!
//! ```text
//! -----BEGIN MINIREPO SIGNATURE-----
//! Hash: sha256
//! Key-Id: 3f1c0e0a9b7d2c11
//!
//! <base64, 64 columns>
//! -----END MINIREPO SIGNATURE-----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

const LINE_WIDTH: usize = 64;

/// What an armored block contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorKind {
    PublicKey,
    PrivateKey,
    Signature,
}

impl ArmorKind {
    fn label(&self) -> &'static str {
        match self {
            ArmorKind::PublicKey => "PUBLIC KEY",
            ArmorKind::PrivateKey => "PRIVATE KEY",
            ArmorKind::Signature => "SIGNATURE",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "PUBLIC KEY" => Some(ArmorKind::PublicKey),
            "PRIVATE KEY" => Some(ArmorKind::PrivateKey),
            "SIGNATURE" => Some(ArmorKind::Signature),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ArmorError {
    #[error("no armor header line found")]
    MissingBegin,

    #[error("unknown armor type '{0}'")]
    UnknownKind(String),

    #[error("expected {expected:?} armor, found {found:?}")]
    WrongKind { expected: ArmorKind, found: ArmorKind },

    #[error("malformed armor header line '{0}'")]
    BadHeader(String),

    #[error("armor end line missing")]
    MissingEnd,

    #[error("armor body is not valid base64")]
    Base64(#[from] base64::DecodeError),
}

/// A decoded armored block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armored {
    pub kind: ArmorKind,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Armored {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Encode `body` as an armored block
pub fn encode(kind: ArmorKind, headers: &[(&str, &str)], body: &[u8]) -> String {
    let label = kind.label();
    let mut out = format!("-----BEGIN MINIREPO {label}-----\n");
    for (key, value) in headers {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push('\n');

    let encoded = STANDARD.encode(body);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is pure ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END MINIREPO {label}-----\n"));
    out
}

/// Decode the first armored block in `text`
pub fn decode(text: &str) -> Result<Armored, ArmorError> {
    let mut lines = text.lines().map(str::trim_end);

    let label = lines
        .by_ref()
        .find_map(|line| {
            line.strip_prefix("-----BEGIN MINIREPO ")
                .and_then(|rest| rest.strip_suffix("-----"))
        })
        .ok_or(ArmorError::MissingBegin)?;
    let kind = ArmorKind::from_label(label).ok_or_else(|| ArmorError::UnknownKind(label.to_string()))?;

    let mut headers = Vec::new();
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| ArmorError::BadHeader(line.to_string()))?;
        headers.push((key.to_string(), value.to_string()));
    }

    let end_line = format!("-----END MINIREPO {label}-----");
    let mut encoded = String::new();
    let mut terminated = false;
    for line in lines {
        if line == end_line {
            terminated = true;
            break;
        }
        encoded.push_str(line.trim());
    }
    if !terminated {
        return Err(ArmorError::MissingEnd);
    }

    Ok(Armored {
        kind,
        headers,
        body: STANDARD.decode(encoded)?,
    })
}

/// Decode and insist on a particular kind
pub fn decode_kind(text: &str, expected: ArmorKind) -> Result<Armored, ArmorError> {
    let armored = decode(text)?;
    if armored.kind != expected {
        return Err(ArmorError::WrongKind {
            expected,
            found: armored.kind,
        });
    }
    Ok(armored)
}
