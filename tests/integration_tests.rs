//! Integration tests for Anyfind
//!
//! Note: a returned chain is outermost-first; the empty chain means the
//! haystack contains a value literally. When several chains explain a
//! match, whichever race branch resolves first wins, so tests accept any
//! sound chain where more than one exists.

use std::io::Read;

use anyfind::{AddConfig, FindConfig, Searcher, SearcherError};
use flate2::read::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use sha2::{Digest, Sha256};

fn chain(parts: &[&str]) -> Option<Vec<String>> {
    Some(parts.iter().map(|part| part.to_string()).collect())
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzEncoder::new(data, Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    DeflateEncoder::new(data, Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// A base64-wrapped value is found one decode layer in.
#[tokio::test]
async fn test_base64_wrapped_value() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"first").unwrap();

    let found = searcher.find_value_in(b"Zmlyc3Q=").await.unwrap();
    assert_eq!(found, chain(&["base64"]));
}

/// A hex-wrapped value is found one decode layer in.
#[tokio::test]
async fn test_hex_wrapped_value() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"second1234567890").unwrap();

    let haystack = hex::encode(b"second1234567890");
    let found = searcher.find_value_in(haystack.as_bytes()).await.unwrap();
    assert_eq!(found, chain(&["hex"]));
}

/// A value inside a gzipped JSON document needs the compress layer peeled
/// first, then the JSON string-literal layer.
#[tokio::test]
async fn test_value_in_gzipped_json() {
    let value = "\"some value!\" \u{1F60E}";
    let mut searcher = Searcher::new();
    searcher.add_value(value.as_bytes()).unwrap();

    let document = serde_json::json!({ "stuff": value, "more": "idk" }).to_string();
    let haystack = gzip(document.as_bytes());

    let found = searcher.find_value_in(&haystack).await.unwrap();
    assert_eq!(found, chain(&["compress", "json-string"]));
}

/// Raw-deflated data wrapped in base64 and surrounded by query noise:
/// both decode layers are discovered even with no encoded needles at all.
#[tokio::test]
async fn test_base64_deflate_surrounded() {
    let mut searcher = Searcher::new();
    let config = AddConfig {
        max_encode_layers: 0,
        ..AddConfig::default()
    };
    searcher.add_value_with_config(b"value", &config).unwrap();

    let compressed = deflate_raw(&b"value".repeat(100));
    let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &compressed);
    let haystack = format!("stuff={}; more=idk", encoded);

    let found = searcher.find_value_in(haystack.as_bytes()).await.unwrap();
    assert_eq!(found, chain(&["base64", "compress"]));
}

/// A double hash is matched through pre-computed needles; a triple hash
/// exceeds the encode budget and stays invisible.
#[tokio::test]
async fn test_double_hash_found_triple_not() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"value2").unwrap();

    let double = sha256(&sha256(b"value2"));
    let found = searcher.find_value_in(&double).await.unwrap();
    assert_eq!(found, chain(&["sha256", "sha256"]));

    let triple = sha256(&sha256(&sha256(b"value2")));
    let found = searcher.find_value_in(&triple).await.unwrap();
    assert_eq!(found, None);
}

/// A multipart body carrying hex(sha256(value)) in a field: the hex token
/// is reachable both through the multipart parser and directly in the
/// body, so two chains are sound.
#[tokio::test]
async fn test_multipart_field_with_hashed_email() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"mail@example.com").unwrap();

    let digest = hex::encode(sha256(b"mail@example.com"));
    let haystack = format!(
        "--boundary123\r\n\
         Content-Disposition: form-data; name=\"uid\"\r\n\
         \r\n\
         {}\r\n\
         --boundary123--\r\n",
        digest
    );

    let found = searcher.find_value_in(haystack.as_bytes()).await.unwrap();
    let accepted = [
        chain(&["hex", "sha256"]),
        chain(&["form-data", "hex", "sha256"]),
    ];
    assert!(accepted.contains(&found), "unexpected chain: {:?}", found);
}

/// LZ-String's base64 rendering: the base64 layer is peeled by the base64
/// transformer (including its ragged-tail repair), then LZ-String
/// decompression exposes the value.
#[tokio::test]
async fn test_lz_string_base64_rendering() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"value").unwrap();

    let haystack = lz_str::compress_to_base64("value");
    let found = searcher.find_value_in(haystack.as_bytes()).await.unwrap();
    assert_eq!(found, chain(&["base64", "lz-string"]));
}

/// LZ-String's byte rendering decodes directly.
#[tokio::test]
async fn test_lz_string_bytes_rendering() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"value").unwrap();

    let haystack = lz_str::compress_to_uint8_array("value");
    let found = searcher.find_value_in(&haystack).await.unwrap();
    assert_eq!(found, chain(&["lz-string"]));
}

/// Percent-escaped values decode through the uri layer, with `+` read as
/// a space.
#[tokio::test]
async fn test_uri_encoded_value() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"a value!").unwrap();

    let found = searcher
        .find_value_in(b"q=a%20value%21&lang=en")
        .await
        .unwrap();
    assert_eq!(found, chain(&["uri"]));

    let found = searcher.find_value_in(b"q=a+value%21").await.unwrap();
    assert_eq!(found, chain(&["uri"]));
}

/// Entity-encoded markup decodes through the html-entities layer.
#[tokio::test]
async fn test_html_entity_encoded_value() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"<session token>").unwrap();

    let found = searcher
        .find_value_in(b"<input value=&lt;session token&gt; disabled>")
        .await
        .unwrap();
    assert_eq!(found, chain(&["html-entities"]));
}

/// Absent values settle to None, not an error.
#[tokio::test]
async fn test_absence_returns_none() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"not-present-anywhere").unwrap();

    let found = searcher
        .find_value_in(b"aGVsbG8= 6465616462656566 q=a%20b")
        .await
        .unwrap();
    assert_eq!(found, None);
}

/// Decode bound honoring: with zero decode layers the searcher degrades
/// to a literal scan.
#[tokio::test]
async fn test_zero_decode_layers_is_literal_scan() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"plain").unwrap();

    let config = FindConfig {
        max_decode_layers: 0,
        ..FindConfig::default()
    };

    let found = searcher
        .find_value_in_with_config(b"xx plain xx", &config)
        .await
        .unwrap();
    assert_eq!(found, chain(&[]));

    // base64("plain") = "cGxhaW4=" requires one decode layer.
    let found = searcher
        .find_value_in_with_config(b"cGxhaW4=", &config)
        .await
        .unwrap();
    assert_eq!(found, None);
}

/// Terminal-layer policy: with a single encode layer that must be
/// non-reversible, a base64 haystack is invisible at decode depth zero;
/// relaxing the policy makes the base64 form itself a needle.
#[tokio::test]
async fn test_terminal_layer_policy() {
    let haystack = b"dHJhY2tlZA=="; // base64("tracked")
    let find_config = FindConfig {
        max_decode_layers: 0,
        ..FindConfig::default()
    };

    let mut strict = Searcher::new();
    strict
        .add_value_with_config(
            b"tracked",
            &AddConfig {
                max_encode_layers: 1,
                ..AddConfig::default()
            },
        )
        .unwrap();
    let found = strict
        .find_value_in_with_config(haystack, &find_config)
        .await
        .unwrap();
    assert_eq!(found, None);

    let mut relaxed = Searcher::new();
    relaxed
        .add_value_with_config(
            b"tracked",
            &AddConfig {
                max_encode_layers: 1,
                end_with_non_reversible_layer: false,
                ..AddConfig::default()
            },
        )
        .unwrap();
    let found = relaxed
        .find_value_in_with_config(haystack, &find_config)
        .await
        .unwrap();
    assert_eq!(found, chain(&["base64"]));
}

/// Multiple values share one searcher; each is found independently.
#[tokio::test]
async fn test_multiple_values() {
    let searcher = Searcher::from_values(["alpha-secret", "beta-secret"]).unwrap();

    let found = searcher.find_value_in(b"YWxwaGEtc2VjcmV0").await.unwrap();
    assert_eq!(found, chain(&["base64"]));

    let found = searcher
        .find_value_in(hex::encode(b"beta-secret").as_bytes())
        .await
        .unwrap();
    assert_eq!(found, chain(&["hex"]));
}

/// Concurrent searches over one searcher return the same results as
/// sequential ones.
#[tokio::test]
async fn test_concurrent_searches_agree() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"first").unwrap();
    searcher.add_value(b"second1234567890").unwrap();

    let haystacks: Vec<Vec<u8>> = vec![
        b"Zmlyc3Q=".to_vec(),
        hex::encode(b"second1234567890").into_bytes(),
        b"nothing to see".to_vec(),
        gzip(b"wrapped first wrapped"),
    ];

    let mut sequential = Vec::new();
    for haystack in &haystacks {
        sequential.push(searcher.find_value_in(haystack).await.unwrap());
    }

    let concurrent = futures::future::join_all(
        haystacks
            .iter()
            .map(|haystack| searcher.find_value_in(haystack)),
    )
    .await;
    let concurrent: Vec<_> = concurrent.into_iter().map(Result::unwrap).collect();

    assert_eq!(sequential, concurrent);
    assert_eq!(sequential[0], chain(&["base64"]));
    assert_eq!(sequential[1], chain(&["hex"]));
    assert_eq!(sequential[2], None);
    assert_eq!(sequential[3], chain(&["compress"]));
}

/// Contract violations fail fast and leave the searcher usable.
#[tokio::test]
async fn test_contract_violations() {
    let mut searcher = Searcher::new();

    assert!(matches!(
        searcher.add_value(b""),
        Err(SearcherError::EmptyValue)
    ));
    assert!(matches!(
        searcher.find_value_in(b"haystack").await,
        Err(SearcherError::NoValuesAdded)
    ));

    searcher.add_value(b"recovered").unwrap();
    let found = searcher.find_value_in(b"cmVjb3ZlcmVk").await.unwrap();
    assert_eq!(found, chain(&["base64"]));
}

/// Arbitrary binary values survive a two-layer textual encoding chain.
#[tokio::test]
async fn test_random_binary_value_two_layers() {
    use rand::RngCore;

    let mut value = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut value);

    let mut searcher = Searcher::new();
    searcher.add_value(&value).unwrap();

    let haystack = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        hex::encode(value).as_bytes(),
    );
    let found = searcher.find_value_in(haystack.as_bytes()).await.unwrap();
    assert_eq!(found, chain(&["base64", "hex"]));
}

/// Needle soundness: every pre-computed needle's chain names its own
/// outermost encoder first, and raw values carry the empty chain.
#[test]
fn test_needle_chains_are_outermost_first() {
    let mut searcher = Searcher::new();
    searcher.add_value(b"value2").unwrap();

    let raw_needles: Vec<_> = searcher
        .needles()
        .iter()
        .filter(|needle| needle.is_raw_value())
        .collect();
    assert_eq!(raw_needles.len(), 1);
    assert_eq!(raw_needles[0].buffer, b"value2");

    // The single-layer sha256 needle is the digest of the value; the
    // double-layer one is the digest of the digest.
    let digest = sha256(b"value2");
    assert!(searcher
        .needles()
        .iter()
        .any(|needle| needle.chain == vec!["sha256".to_string()] && needle.buffer == digest));
    let double = sha256(&digest);
    assert!(searcher.needles().iter().any(
        |needle| needle.chain == vec!["sha256".to_string(), "sha256".to_string()]
            && needle.buffer == double
    ));
}
