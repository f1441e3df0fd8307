// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Titles a spammer might use; every one is tag-shaped somewhere.
pub fn generate_spam_titles() -> Vec<&'static str> {
    vec![
        "<i>Hello</i>",
        "<b>Breaking</b> News",
        "Cheap pills <a href=\"https://spam.example/buy\">here</a>",
        "Win big<br/>today",
        "<script>alert(1)</script>",
        "<img src='https://spam.example/pixel.gif'>",
        "<span class=promo>50% off</span>",
    ]
}

/// Titles that must not trip the markup heuristic.
pub fn generate_plain_titles() -> Vec<&'static str> {
    vec![
        "Plain Text Title",
        "Why 2 < 3 and 5 > 4",
        "Rust &amp; IndieWeb",
        "Notes on <-> arrows",
        "",
    ]
}

/// Request bodies that are not a usable `pingback.ping` call.
pub fn generate_invalid_payloads() -> Vec<String> {
    vec![
        String::new(),
        "   \n ".to_string(),
        "pingback.ping".to_string(),
        "<methodCall><methodName>weblogUpdates.ping</methodName></methodCall>".to_string(),
        "<methodCall><methodName>pingback.ping</methodName><params></methodCall>".to_string(),
        "<methodCall><methodName>pingback.ping</methodName><params>\
         <param><value><string>https://remote.example/a</string></value></param>\
         </params></methodCall>"
            .to_string(),
        "<methodCall><methodName>pingback.ping</methodName><params></params></methodCall>"
            .to_string(),
    ]
}

/// Malformed source URL variations; each must be rejected before any fetch.
pub fn generate_malformed_urls() -> Vec<&'static str> {
    vec![
        "not-a-url",
        "ftp://wrong-scheme.com/",
        "://missing-scheme.com/",
        "https://",
        "javascript:alert(1)",
        "file:///etc/passwd",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }
}
