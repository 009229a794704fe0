// ABOUTME: CONNECT digest computation and login timestamp formatting
// ABOUTME: Maps CONNECT_RESP status codes onto operator-readable reasons

use crate::client::config::ClientConfig;
use crate::datatypes::{Connect, CMPP_VERSION};
use chrono::{DateTime, Datelike, Local, Timelike};
use md5::{Digest, Md5};

/// Build the CONNECT frame for this login attempt.
pub(crate) fn build_connect(config: &ClientConfig, sequence_id: u32) -> Connect {
    let timestamp = connect_timestamp(&Local::now());
    let stamp_text = format!("{timestamp:010}");

    Connect {
        sequence_id,
        source_addr: config.username.clone(),
        authenticator_source: authenticator_source(&config.username, &config.password, &stamp_text),
        version: CMPP_VERSION,
        timestamp,
    }
}

/// Login wall-clock time packed as decimal MMddhhmmss.
pub(crate) fn connect_timestamp(now: &DateTime<Local>) -> u32 {
    now.month() * 100_000_000
        + now.day() * 1_000_000
        + now.hour() * 10_000
        + now.minute() * 100
        + now.second()
}

/// AuthenticatorSource = MD5(Source_Addr + 9 zero octets + secret + timestamp).
///
/// Every input contributes the low byte of each of its UTF-16 code units;
/// for the ASCII credentials and digits the fields are supposed to hold this
/// is the identity mapping.
pub(crate) fn authenticator_source(username: &str, password: &str, timestamp: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(ascii_bytes(username));
    hasher.update([0u8; 9]);
    hasher.update(ascii_bytes(password));
    hasher.update(ascii_bytes(timestamp));
    hasher.finalize().into()
}

fn ascii_bytes(value: &str) -> Vec<u8> {
    value.encode_utf16().map(|unit| unit as u8).collect()
}

/// Operator-readable reason for a CONNECT_RESP status.
pub(crate) fn connect_status_text(status: u32) -> &'static str {
    match status {
        0 => "认证成功",
        1 => "消息结构错误",
        2 => "非法源地址",
        3 => "认证失败",
        4 => "版本太高",
        _ => "未知错误",
    }
}
