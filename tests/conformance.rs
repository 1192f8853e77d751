//! Checks every registered extractor against its own example pages.
//!
//! URL routing runs offline. The extraction checks hit the live sites and
//! are ignored by default; run them with `cargo test -- --ignored`. Each
//! live test builds its own `Registry` so no HTTP connection outlives the
//! runtime that opened it.

use torah_dl::{extract, ErrorKind, Extractor, Registry};

#[test]
fn every_example_routes_to_its_own_extractor() {
    let registry = Registry::default();
    for extractor in registry.extractors() {
        for example in extractor.examples() {
            let routed = registry.find(example.url).map(|e| e.name());
            assert_eq!(
                routed,
                Some(extractor.name()),
                "{} example {} routed elsewhere",
                extractor.name(),
                example.name
            );
        }
    }
}

#[test]
fn no_extractor_claims_another_sites_examples() {
    let registry = Registry::default();
    for owner in registry.extractors() {
        for example in owner.examples() {
            for other in registry.extractors() {
                if other.name() == owner.name() {
                    continue;
                }
                assert!(
                    !other.matches(example.url),
                    "{} matches {} example {}",
                    other.name(),
                    owner.name(),
                    example.url
                );
            }
        }
    }
}

#[test]
fn examples_are_well_formed() {
    for extractor in Registry::default().extractors() {
        for example in extractor.examples() {
            assert!(extractor.matches(example.url), "{}", example.url);
            if example.valid {
                assert!(!example.download_url.is_empty(), "{}", example.name);
                assert!(!example.title.is_empty(), "{}", example.name);
                assert!(!example.file_format.is_empty(), "{}", example.name);
            }
        }
    }
}

#[tokio::test]
async fn unknown_site_is_extractor_not_found() {
    let err = extract("https://www.gashmius.xyz/").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExtractorNotFound);
}

#[tokio::test]
#[ignore = "hits live sites"]
async fn valid_examples_extract() {
    let registry = Registry::default();
    for extractor in registry.extractors() {
        for example in extractor.examples().iter().filter(|e| e.valid) {
            let extraction = extractor
                .extract(example.url)
                .await
                .unwrap_or_else(|e| panic!("{} {}: {}", extractor.name(), example.name, e));
            assert_eq!(extraction.download_url, example.download_url, "{}", example.name);
            assert_eq!(extraction.title.as_deref(), Some(example.title), "{}", example.name);
            assert_eq!(
                extraction.file_format.as_deref(),
                Some(example.file_format),
                "{}",
                example.name
            );
        }
    }
}

#[tokio::test]
#[ignore = "hits live sites"]
async fn invalid_examples_fail() {
    let registry = Registry::default();
    for extractor in registry.extractors() {
        for example in extractor.examples().iter().filter(|e| !e.valid) {
            let result = extractor.extract(example.url).await;
            assert!(
                result.is_err(),
                "{} {} unexpectedly extracted {:?}",
                extractor.name(),
                example.name,
                result
            );
        }
    }
}

#[tokio::test]
#[ignore = "hits live sites"]
async fn yutorah_lecture_end_to_end() {
    let extraction = Registry::default()
        .resolve(
            "https://www.yutorah.org/lectures/1116616/Praying-for-Rain-and-the-International-Traveler",
        )
        .await
        .unwrap();
    assert_eq!(
        extraction.download_url,
        "https://download.yutorah.org/2024/986/1116616/praying-for-rain-and-the-international-traveler.mp3"
    );
    assert_eq!(
        extraction.title.as_deref(),
        Some("Praying for Rain and the International Traveler")
    );
    assert_eq!(extraction.file_format.as_deref(), Some("audio/mp3"));
}
