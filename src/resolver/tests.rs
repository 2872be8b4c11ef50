use super::*;

fn cdn() -> UrlResolver {
    UrlResolver::new("https://cdn.example.com")
}

#[test]
fn empty_input_means_no_source() {
    assert_eq!(cdn().resolve(""), "");
    assert_eq!(cdn().resolve("   "), "");
}

#[test]
fn absolute_addresses_pass_through_unchanged() {
    let r = cdn();
    let abs = "https://other.example.com/a b.mp3";
    assert_eq!(r.resolve(abs), abs);
    assert_eq!(r.resolve("HTTP://x.example.com/y.mp3"), "HTTP://x.example.com/y.mp3");
}

#[test]
fn resolving_an_absolute_result_is_idempotent() {
    let r = cdn();
    for raw in ["/songs/a b.mp3", "songs/ção.mp3", "https://x.example.com/z.mp3"] {
        let once = r.resolve(raw);
        assert_eq!(r.resolve(&once), once);
    }
}

#[test]
fn relative_path_joins_with_one_slash_and_encodes_spaces() {
    assert_eq!(
        cdn().resolve("/songs/a b.mp3"),
        "https://cdn.example.com/songs/a%20b.mp3"
    );
}

#[test]
fn join_never_doubles_or_drops_the_separator() {
    let expected = "https://cdn.example.com/songs/x.mp3";
    assert_eq!(UrlResolver::new("https://cdn.example.com/").resolve("/songs/x.mp3"), expected);
    assert_eq!(UrlResolver::new("https://cdn.example.com").resolve("songs/x.mp3"), expected);
    assert_eq!(UrlResolver::new("https://cdn.example.com//").resolve("//songs/x.mp3"), expected);
}

#[test]
fn non_ascii_is_percent_encoded_and_delimiters_survive() {
    assert_eq!(
        cdn().resolve("músicas/Tua Graça.mp3?v=1&q=2#t"),
        "https://cdn.example.com/m%C3%BAsicas/Tua%20Gra%C3%A7a.mp3?v=1&q=2#t"
    );
}

#[test]
fn already_escaped_paths_are_not_escaped_twice() {
    assert_eq!(
        cdn().resolve("songs/a%20b.mp3"),
        "https://cdn.example.com/songs/a%20b.mp3"
    );
    assert_eq!(cdn().resolve("100%.mp3"), "https://cdn.example.com/100%25.mp3");
}

#[test]
fn is_absolute_recognizes_http_schemes_only() {
    assert!(is_absolute("http://a"));
    assert!(is_absolute("https://a"));
    assert!(!is_absolute("/songs/a.mp3"));
    assert!(!is_absolute("ftp://a"));
    assert!(!is_absolute("ht"));
}

#[test]
fn escaped_delimiters_stay_escaped() {
    let r = cdn();
    assert_eq!(
        r.resolve("songs/track%231.mp3"),
        "https://cdn.example.com/songs/track%231.mp3"
    );
    assert_eq!(r.resolve("songs/AC%2FDC.mp3"), "https://cdn.example.com/songs/AC%2FDC.mp3");
    assert_eq!(r.resolve("songs/why%3F.mp3"), "https://cdn.example.com/songs/why%3F.mp3");
}

#[test]
fn escapes_of_non_utf8_bytes_are_kept_verbatim() {
    assert_eq!(cdn().resolve("songs/%FF.mp3"), "https://cdn.example.com/songs/%FF.mp3");
    assert_eq!(cdn().resolve("songs/%ff%zz.mp3"), "https://cdn.example.com/songs/%ff%25zz.mp3");
}

#[test]
fn brackets_are_encoded() {
    assert_eq!(
        cdn().resolve("songs/[live] set.mp3"),
        "https://cdn.example.com/songs/%5Blive%5D%20set.mp3"
    );
}
