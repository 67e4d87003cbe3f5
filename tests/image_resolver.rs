use blogger2hugo::images::{discover, resolve, ImageFetchError, MockImageFetcher};
use scraper::Html;

#[test]
fn discover_returns_distinct_sources_in_document_order() {
    let doc = Html::parse_fragment(
        "<img src=\"http://x/a.png\">\
         <img src=\"http://x/b.png\">\
         <img src=\"http://x/a.png\">\
         <img src=\"\">",
    );
    assert_eq!(discover(&doc), vec!["http://x/a.png", "http://x/b.png"]);
}

#[tokio::test]
async fn same_remote_url_is_fetched_exactly_once_and_shares_a_local_name() {
    let doc = Html::parse_fragment(
        "<img src=\"http://x/photo.png\"><p>again</p><img src=\"http://x/photo.png\">",
    );
    let sources = discover(&doc);
    assert_eq!(sources.len(), 1);

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == "http://x/photo.png")
        .times(1)
        .returning(|_| Ok(vec![1, 2, 3]));

    let set = resolve(&sources, &fetcher).await;
    assert_eq!(set.markdown_target("http://x/photo.png"), "images/photo.png");
    // Both references in the body resolve through the same entry.
    assert_eq!(set.fetched().count(), 1);
}

#[tokio::test]
async fn distinct_urls_with_colliding_cleaned_names_get_numeric_suffixes() {
    let sources = vec![
        "http://a.example/pic_1.png".to_string(),
        "http://b.example/pic-1.png".to_string(),
    ];
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().times(2).returning(|_| Ok(vec![0]));

    let set = resolve(&sources, &fetcher).await;
    assert_eq!(
        set.markdown_target("http://a.example/pic_1.png"),
        "images/pic-1.png"
    );
    assert_eq!(
        set.markdown_target("http://b.example/pic-1.png"),
        "images/pic-1-2.png"
    );
}

#[tokio::test]
async fn local_name_defaults_extension_when_url_has_none() {
    let sources = vec!["http://x.example/raw-image".to_string()];
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().returning(|_| Ok(vec![0]));

    let set = resolve(&sources, &fetcher).await;
    assert_eq!(
        set.markdown_target("http://x.example/raw-image"),
        "images/raw-image.jpg"
    );
}

#[tokio::test]
async fn query_strings_are_stripped_from_local_names() {
    let sources = vec!["http://x.example/shot.png?width=640".to_string()];
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().returning(|_| Ok(vec![0]));

    let set = resolve(&sources, &fetcher).await;
    assert_eq!(
        set.markdown_target("http://x.example/shot.png?width=640"),
        "images/shot.png"
    );
}

#[tokio::test]
async fn failed_fetch_keeps_remote_url_and_is_recorded() {
    let sources = vec![
        "http://x.example/ok.png".to_string(),
        "http://x.example/gone.png".to_string(),
    ];
    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url.ends_with("ok.png"))
        .returning(|_| Ok(vec![9]));
    fetcher
        .expect_fetch()
        .withf(|url| url.ends_with("gone.png"))
        .returning(|_| Err(ImageFetchError::Status(404)));

    let set = resolve(&sources, &fetcher).await;
    assert_eq!(set.markdown_target("http://x.example/ok.png"), "images/ok.png");
    assert_eq!(
        set.markdown_target("http://x.example/gone.png"),
        "http://x.example/gone.png"
    );
    assert_eq!(set.failures().len(), 1);
    assert_eq!(set.failures()[0].0, "http://x.example/gone.png");
    assert_eq!(set.failures()[0].1, ImageFetchError::Status(404));
}
