use blogger2hugo::images::{self, ImageSet, MockImageFetcher};
use blogger2hugo::markdown::convert_body;
use scraper::Html;

fn convert_without_images(html: &str) -> String {
    convert_body(&Html::parse_fragment(html), &ImageSet::empty())
}

async fn convert_with_fetched_images(html: &str, fetcher: &MockImageFetcher) -> String {
    let doc = Html::parse_fragment(html);
    let sources = images::discover(&doc);
    let set = images::resolve(&sources, fetcher).await;
    convert_body(&doc, &set)
}

#[test]
fn paragraphs_become_blank_line_separated_text() {
    let markdown = convert_without_images("<p>First</p><p>Second</p>");
    assert_eq!(markdown, "First\n\nSecond");
}

#[test]
fn inline_markup_maps_to_markdown_equivalents() {
    let markdown = convert_without_images(
        "<p>Some <em>emphasis</em>, <strong>bold</strong> and a \
         <a href=\"https://example.com/\">link</a>.</p>",
    );
    assert_eq!(
        markdown,
        "Some *emphasis*, **bold** and a [link](https://example.com/)."
    );
}

#[test]
fn b_and_i_are_treated_like_strong_and_em() {
    let markdown = convert_without_images("<p><i>it</i> <b>bold</b></p>");
    assert_eq!(markdown, "*it* **bold**");
}

#[test]
fn line_breaks_are_preserved_inside_paragraphs() {
    let markdown = convert_without_images("<p>one<br>two</p>");
    assert_eq!(markdown, "one\ntwo");
}

#[test]
fn unsupported_elements_are_embedded_as_raw_html_in_document_order() {
    let markdown = convert_without_images(
        "<p>before</p><blockquote>quoted</blockquote><p>after</p>",
    );
    let before = markdown.find("before").expect("before present");
    let quote = markdown.find("<blockquote>quoted</blockquote>").expect("raw html kept");
    let after = markdown.find("after").expect("after present");
    assert!(before < quote && quote < after);
}

#[test]
fn simple_table_becomes_pipe_delimited_markdown_with_inferred_header() {
    let markdown = convert_without_images(
        "<table>\
           <tr><th>Name</th><th>Role</th></tr>\
           <tr><td>Ada</td><td>Engineer</td></tr>\
           <tr><td>Grace</td><td>Admiral</td></tr>\
         </table>",
    );
    let lines: Vec<&str> = markdown.lines().collect();
    assert_eq!(lines[0], "| Name | Role |");
    assert_eq!(lines[1], "| --- | --- |");
    assert_eq!(lines[2], "| Ada | Engineer |");
    assert_eq!(lines[3], "| Grace | Admiral |");
}

#[test]
fn table_cells_keep_their_text_content_across_conversion() {
    let cells = [["Name", "Role"], ["Ada", "Engineer"], ["Grace", "Admiral"]];
    let html: String = format!(
        "<table>{}</table>",
        cells
            .iter()
            .map(|row| format!("<tr><td>{}</td><td>{}</td></tr>", row[0], row[1]))
            .collect::<String>()
    );
    let markdown = convert_without_images(&html);

    // Re-read the markdown table and compare the cell text grid.
    let rendered: Vec<Vec<&str>> = markdown
        .lines()
        .filter(|line| !line.contains("---"))
        .map(|line| {
            line.trim_matches('|')
                .split('|')
                .map(str::trim)
                .collect::<Vec<_>>()
        })
        .collect();
    let expected: Vec<Vec<&str>> = cells.iter().map(|row| row.to_vec()).collect();
    assert_eq!(rendered, expected);
}

#[test]
fn table_with_merged_cell_is_emitted_as_raw_html_not_markdown() {
    let html = "<table>\
                  <tr><td colspan=\"2\">Span</td></tr>\
                  <tr><td>a</td><td>b</td></tr>\
                </table>";
    let markdown = convert_without_images(html);
    assert!(markdown.contains("colspan=\"2\""));
    assert!(markdown.contains("<table>") || markdown.contains("<table "));
    assert!(!markdown.contains("| ---"));
}

#[test]
fn pipe_characters_in_cells_are_escaped() {
    let markdown = convert_without_images(
        "<table><tr><td>a|b</td><td>c</td></tr><tr><td>x</td><td>y</td></tr></table>",
    );
    assert!(markdown.contains("a\\|b"));
}

#[test]
fn ragged_rows_are_padded_to_the_widest_row() {
    let markdown = convert_without_images(
        "<table><tr><td>h1</td><td>h2</td></tr><tr><td>only</td></tr></table>",
    );
    let lines: Vec<&str> = markdown.lines().collect();
    assert_eq!(lines[2], "| only |  |");
}

#[tokio::test]
async fn image_reference_targets_local_file_when_fetch_succeeds() {
    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == "http://x/y_z.png")
        .times(1)
        .returning(|_| Ok(vec![0xFF, 0xD8]));

    let markdown =
        convert_with_fetched_images("<p>Hi</p><img src=\"http://x/y_z.png\">", &fetcher).await;
    assert_eq!(markdown, "Hi\n\n![](images/y-z.png)");
}

#[tokio::test]
async fn image_reference_keeps_remote_url_when_fetch_fails() {
    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .returning(|_| Err(blogger2hugo::images::ImageFetchError::Status(404)));

    let markdown = convert_with_fetched_images(
        "<img src=\"http://x/gone.png\" alt=\"gone\">",
        &fetcher,
    )
    .await;
    assert_eq!(markdown, "![gone](http://x/gone.png)");
}

#[test]
fn images_with_empty_src_are_dropped() {
    let markdown = convert_without_images("<p>text</p><img src=\"\">");
    assert_eq!(markdown, "text");
}

#[test]
fn youtube_iframe_becomes_hugo_shortcode() {
    let markdown = convert_without_images(
        "<iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\"></iframe>",
    );
    assert_eq!(markdown, "{{< youtube dQw4w9WgXcQ >}}");
}

#[test]
fn google_drive_iframe_becomes_download_link() {
    let markdown = convert_without_images(
        "<iframe src=\"https://drive.google.com/file/d/FILE123/preview\"></iframe>",
    );
    assert_eq!(
        markdown,
        "[Download PDF](https://drive.google.com/uc?export=download&id=FILE123)"
    );
}

#[test]
fn other_iframes_stay_raw() {
    let markdown =
        convert_without_images("<iframe src=\"https://example.com/widget\"></iframe>");
    assert!(markdown.contains("<iframe"));
    assert!(markdown.contains("https://example.com/widget"));
}
