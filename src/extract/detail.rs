//! Detail-page field extraction.
//!
//! No stable schema is guaranteed on profile pages, so fields come from a
//! fallback sequence: embedded JSON-LD first, then DOM selectors, then
//! regular expressions over the page text. The result is a plain value —
//! classification and identity are applied by the pipeline.

use super::structured;
use regex::Regex;
use scraper::{Html, Selector};

/// Cap applied to the first-review snippet.
const REVIEW_SNIPPET_MAX: usize = 400;

/// Raw descriptive fields pulled from one detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub name: String,
    pub category: String,
    pub address: String,
    pub phone: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub image_url: String,
    pub first_review: String,
}

/// Clean up a display name captured from a list page.
///
/// Names longer than 100 chars are whole-card captures: keep the first line
/// and strip a leading "N." ordinal.
pub fn clean_fallback_name(raw: &str) -> String {
    let mut name = raw.trim().to_string();
    if name.chars().count() > 100 {
        if let Some(first) = name.lines().next() {
            name = first.trim().to_string();
        }
        if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            if let Some((_, rest)) = name.split_once('.') {
                name = rest.trim().to_string();
            }
        }
    }
    name
}

/// Extract descriptive fields from a detail page's HTML.
pub fn extract_detail_fields(html: &str, fallback_name: &str) -> DetailFields {
    let doc = Html::parse_document(html);
    let mut fields = DetailFields {
        name: clean_fallback_name(fallback_name),
        category: "기타".to_string(),
        ..DetailFields::default()
    };

    // Declared business record takes priority for every field it carries.
    if let Some(biz) = structured::business_record(&doc) {
        if let Some(name) = biz.name.filter(|n| !n.trim().is_empty()) {
            fields.name = name;
        }
        fields.rating = biz.rating;
        fields.review_count = biz.review_count.unwrap_or(0);
        if let Some(address) = biz.address {
            fields.address = address;
        }
        if let Some(image) = biz.image {
            fields.image_url = image;
        }
    }

    let body_text = page_text(&doc);

    if !plausible_title(&fields.name) {
        if let Some(title) = dom_title(&doc) {
            fields.name = title;
        }
    }

    if let Some(category) = first_text(&doc, r#".category, .tag, .type, [class*="category"]"#) {
        fields.category = category;
    }
    if fields.address.is_empty() {
        if let Some(address) = first_text(&doc, r#".address, .location, [class*="address"]"#) {
            fields.address = address;
        }
    }

    if fields.rating.is_none() {
        fields.rating = dom_rating(&doc);
    }
    if fields.review_count == 0 {
        fields.review_count = dom_review_count(&doc);
    }

    fields.phone = phone_number(&doc, &body_text);

    if fields.address.is_empty() {
        // Street-address pattern over the whole page text as a last resort.
        let re = Regex::new(r"서울특?별시\s*\S+구\s*\S+\s*\d+[\d-]*").unwrap();
        if let Some(m) = re.find(&body_text) {
            fields.address = m.as_str().trim().to_string();
        }
    }

    if fields.image_url.is_empty() {
        fields.image_url = page_image(&doc);
    }

    fields.first_review = first_review(&doc);

    if fields.name.trim().is_empty() {
        fields.name = "이름 없음".to_string();
    }

    fields
}

/// A usable title: short, single-line, and not a map-widget caption.
fn plausible_title(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= 50
        && !name.contains('\n')
        && !name.contains("지도")
        && !name.contains("컨트롤러")
}

fn dom_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse(
        r#"h1, h2, .store-name, .restaurant-name, .shop-name, [class*="title"], [class*="name"]"#,
    )
    .unwrap();
    for el in doc.select(&sel) {
        // Map/controller widgets carry title-like classes too; skip them.
        let class = el.value().attr("class").unwrap_or("");
        if class.contains("map") || class.contains("control") {
            continue;
        }
        let text = collect_text(&el);
        if plausible_title(&text) {
            return Some(text);
        }
    }
    None
}

fn dom_rating(doc: &Html) -> Option<f64> {
    let re = Regex::new(r"(\d+\.?\d*)").unwrap();
    let locators = r#"[itemprop="ratingValue"], .point, .rating, .score, [class*="rating"], [class*="score"]"#;
    let sel = Selector::parse(locators).unwrap();
    for el in doc.select(&sel) {
        let text = collect_text(&el);
        if let Some(m) = re.captures(&text).and_then(|c| c.get(1)) {
            if let Ok(v) = m.as_str().parse::<f64>() {
                return Some(v);
            }
        }
    }
    None
}

fn dom_review_count(doc: &Html) -> u32 {
    let counted = Regex::new(r"\(?(\d{1,4})\s*명\)?").unwrap();
    let bare = Regex::new(r"(\d{1,5})").unwrap();
    let sel = Selector::parse(r#"[itemprop="reviewCount"], .review, .count, [class*="review"]"#)
        .unwrap();

    for el in doc.select(&sel) {
        let text = collect_text(&el);
        if let Some(n) = counted
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return n;
        }
        if let Some(n) = bare
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            if n > 0 {
                return n;
            }
        }
    }
    0
}

fn phone_number(doc: &Html, body_text: &str) -> String {
    let sel = Selector::parse(r#"a[href^="tel:"]"#).unwrap();
    if let Some(el) = doc.select(&sel).next() {
        if let Some(href) = el.value().attr("href") {
            let phone = href.trim_start_matches("tel:").trim();
            if !phone.is_empty() {
                return phone.to_string();
            }
        }
    }

    let re = Regex::new(r"(0\d{1,2}-\d{3,4}-\d{4})").unwrap();
    re.captures(body_text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn page_image(doc: &Html) -> String {
    let og = Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#).unwrap();
    if let Some(el) = doc.select(&og).next() {
        if let Some(content) = el.value().attr("content") {
            if !content.is_empty() {
                return content.to_string();
            }
        }
    }

    let candidates = [
        ".photo img",
        ".thumbnail img",
        ".img img",
        ".images img",
        r#"img[alt*="대표"]"#,
        r#"img[alt*="main"]"#,
        "img",
    ];
    for locator in candidates {
        let Ok(sel) = Selector::parse(locator) else {
            continue;
        };
        for img in doc.select(&sel) {
            if let Some(src) = img.value().attr("src") {
                if src.starts_with("http") {
                    return src.to_string();
                }
            }
        }
    }
    String::new()
}

fn first_review(doc: &Html) -> String {
    let locators = r#"[class*="review"] li, [class*="review"] .item, .review-item, .rv-item, .comment, .dc-review"#;
    let sel = Selector::parse(locators).unwrap();
    let ws = Regex::new(r"\s+").unwrap();

    for el in doc.select(&sel) {
        let text = collect_text(&el);
        if text.is_empty() {
            continue;
        }
        let collapsed = ws.replace_all(&text, " ").trim().to_string();
        if collapsed.chars().count() > REVIEW_SNIPPET_MAX {
            let truncated: String = collapsed.chars().take(REVIEW_SNIPPET_MAX).collect();
            return format!("{truncated}...");
        }
        return collapsed;
    }
    String::new()
}

fn first_text(doc: &Html, locators: &str) -> Option<String> {
    let sel = Selector::parse(locators).ok()?;
    doc.select(&sel)
        .map(|el| collect_text(&el))
        .find(|t| !t.is_empty())
}

fn collect_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn page_text(doc: &Html) -> String {
    let sel = Selector::parse("body").unwrap();
    doc.select(&sel)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSONLD_PAGE: &str = r#"
    <html><head>
    <script type="application/ld+json">
    {
      "@type": "Restaurant",
      "name": "순대국 명가",
      "aggregateRating": {"ratingValue": 4.4, "reviewCount": 210},
      "address": {"streetAddress": "서울특별시 중구 남대문로 12"},
      "image": "https://img.example.com/sundae.jpg"
    }
    </script>
    </head><body>
    <div class="category">한식 | 국밥</div>
    <a href="tel:02-318-1234">전화</a>
    <div class="review-item">진한 국물 맛집입니다. 재방문 의사 있어요.</div>
    </body></html>
    "#;

    #[test]
    fn test_jsonld_fields_take_priority() {
        let f = extract_detail_fields(JSONLD_PAGE, "목록에서 온 이름");
        assert_eq!(f.name, "순대국 명가");
        assert_eq!(f.rating, Some(4.4));
        assert_eq!(f.review_count, 210);
        assert_eq!(f.address, "서울특별시 중구 남대문로 12");
        assert_eq!(f.image_url, "https://img.example.com/sundae.jpg");
        assert_eq!(f.category, "한식 | 국밥");
        assert_eq!(f.phone, "02-318-1234");
        assert!(f.first_review.starts_with("진한 국물"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extract_detail_fields(JSONLD_PAGE, "목록에서 온 이름");
        let b = extract_detail_fields(JSONLD_PAGE, "목록에서 온 이름");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dom_fallbacks_without_jsonld() {
        let html = r#"
        <html><body>
        <h1 class="map-title">지도 컨트롤러</h1>
        <h2>회현 칼국수</h2>
        <span class="point">4.1점</span>
        <span class="review">(87명)</span>
        <div class="address">서울특별시 중구 퇴계로 100</div>
        </body></html>
        "#;

        let f = extract_detail_fields(html, "");
        assert_eq!(f.name, "회현 칼국수");
        assert_eq!(f.rating, Some(4.1));
        assert_eq!(f.review_count, 87);
        assert_eq!(f.address, "서울특별시 중구 퇴계로 100");
    }

    #[test]
    fn test_rating_stays_unknown_when_absent() {
        let html = "<html><body><h2>무평점 식당</h2></body></html>";
        let f = extract_detail_fields(html, "무평점 식당");
        assert_eq!(f.rating, None);
        assert_eq!(f.review_count, 0);
    }

    #[test]
    fn test_phone_from_body_text() {
        let html = "<html><body><p>문의: 02-755-0000 (점심시간 제외)</p></body></html>";
        let f = extract_detail_fields(html, "전화집");
        assert_eq!(f.phone, "02-755-0000");
    }

    #[test]
    fn test_address_regex_fallback() {
        let html = "<html><body><p>위치 안내 서울특별시 중구 남대문로5가 21-1 입니다</p></body></html>";
        let f = extract_detail_fields(html, "주소집");
        assert_eq!(f.address, "서울특별시 중구 남대문로5가 21-1");
    }

    #[test]
    fn test_og_image_fallback() {
        let html = r#"
        <html><head><meta property="og:image" content="https://img.example.com/og.jpg"></head>
        <body><img src="/relative.jpg"></body></html>
        "#;
        let f = extract_detail_fields(html, "이미지집");
        assert_eq!(f.image_url, "https://img.example.com/og.jpg");
    }

    #[test]
    fn test_clean_fallback_name_long_capture() {
        let long_tail = "가나다라 ".repeat(30);
        let raw = format!("3. 곰탕집\n평점 4.5\n{long_tail}");
        assert_eq!(clean_fallback_name(&raw), "곰탕집");
        // Short names pass through untouched.
        assert_eq!(clean_fallback_name(" 곰탕집 "), "곰탕집");
    }

    #[test]
    fn test_review_snippet_truncation() {
        let review = "아 ".repeat(400);
        let html = format!(
            r#"<html><body><div class="review-item">{review}</div></body></html>"#
        );
        let f = extract_detail_fields(&html, "리뷰집");
        assert!(f.first_review.ends_with("..."));
        assert_eq!(f.first_review.chars().count(), 400 + 3);
    }

    #[test]
    fn test_empty_fallback_name_placeholder() {
        let f = extract_detail_fields("<html><body></body></html>", "");
        assert_eq!(f.name, "이름 없음");
    }
}
