//! Embedded structured-data parsing (JSON-LD) from raw HTML.
//!
//! Catalog list pages embed `ItemList`/`CollectionPage` blocks and detail
//! pages embed `Restaurant`/`LocalBusiness` blocks; both are parsed here
//! with the `scraper` crate, no JavaScript execution involved.

use scraper::{Html, Selector};
use serde_json::Value;

/// A list entry declared in an embedded ItemList.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedItem {
    pub name: String,
    pub url: String,
}

/// Business fields declared in an embedded Restaurant/LocalBusiness block.
#[derive(Debug, Clone, Default)]
pub struct BusinessRecord {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub address: Option<String>,
    pub image: Option<String>,
}

/// All JSON-LD objects embedded in the document, with `@graph` and
/// top-level arrays flattened.
pub fn jsonld_objects(doc: &Html) -> Vec<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut objects = Vec::new();

    for element in doc.select(&sel) {
        let text = element.inner_html();
        let text = text.trim().trim_start_matches('\u{FEFF}');
        if text.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            continue;
        };
        flatten_into(value, &mut objects);
    }

    objects
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => out.extend(items),
        Value::Object(ref map) if map.contains_key("@graph") => {
            if let Some(Value::Array(items)) = map.get("@graph") {
                out.extend(items.iter().cloned());
            }
        }
        other => out.push(other),
    }
}

fn ld_type(obj: &Value) -> &str {
    obj.get("@type").and_then(|t| t.as_str()).unwrap_or("")
}

/// Extract declared list entries from ItemList / CollectionPage blocks.
pub fn list_items(doc: &Html) -> Vec<ListedItem> {
    let mut items = Vec::new();

    for obj in jsonld_objects(doc) {
        if !matches!(ld_type(&obj), "ItemList" | "CollectionPage") {
            continue;
        }
        let entries = obj
            .get("itemListElement")
            .or_else(|| obj.get("hasPart"))
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        for entry in entries {
            // ListItem wraps the payload in "item"; flat entries carry
            // name/url directly.
            let payload = if ld_type(&entry) == "ListItem" {
                entry.get("item").cloned().unwrap_or(Value::Null)
            } else {
                entry
            };
            let name = payload
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("")
                .to_string();
            if let Some(url) = payload.get("url").and_then(|u| u.as_str()) {
                items.push(ListedItem {
                    name,
                    url: url.to_string(),
                });
            }
        }
    }

    items
}

fn number_or_string_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn number_or_string_u32(v: &Value) -> Option<u32> {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .map(|n| n as u32)
}

/// Extract the first declared business record, if the page carries one.
pub fn business_record(doc: &Html) -> Option<BusinessRecord> {
    for obj in jsonld_objects(doc) {
        if !matches!(ld_type(&obj), "Restaurant" | "LocalBusiness" | "Place") {
            continue;
        }

        let agg = obj.get("aggregateRating");
        let address = obj.get("address").and_then(|a| {
            a.get("streetAddress")
                .or_else(|| a.get("addressLocality"))
                .and_then(|s| s.as_str())
                .map(|s| s.to_string())
        });
        let image = obj.get("image").and_then(|i| {
            i.as_str().map(|s| s.to_string()).or_else(|| {
                i.as_array()
                    .and_then(|a| a.first())
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
        });

        return Some(BusinessRecord {
            name: obj
                .get("name")
                .and_then(|n| n.as_str())
                .map(|s| s.to_string()),
            rating: agg
                .and_then(|a| a.get("ratingValue"))
                .and_then(number_or_string_f64),
            review_count: agg
                .and_then(|a| a.get("reviewCount"))
                .and_then(number_or_string_u32),
            address,
            image,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_items_from_itemlist() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">
        {
          "@type": "ItemList",
          "itemListElement": [
            {"@type": "ListItem", "position": 1,
             "item": {"name": "곰탕집", "url": "https://www.diningcode.com/P/1"}},
            {"@type": "ListItem", "position": 2,
             "item": {"name": "분식당", "url": "https://www.diningcode.com/P/2"}}
          ]
        }
        </script>
        </head><body></body></html>
        "#;

        let doc = Html::parse_document(html);
        let items = list_items(&doc);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "곰탕집");
        assert_eq!(items[1].url, "https://www.diningcode.com/P/2");
    }

    #[test]
    fn test_list_items_flat_entries_and_haspart() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">
        {"@type": "CollectionPage",
         "hasPart": [{"name": "국밥", "url": "https://www.diningcode.com/P/3"}]}
        </script>
        </head><body></body></html>
        "#;

        let doc = Html::parse_document(html);
        let items = list_items(&doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://www.diningcode.com/P/3");
    }

    #[test]
    fn test_business_record_with_string_numbers() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">
        {
          "@type": "Restaurant",
          "name": "순대국 명가",
          "aggregateRating": {"ratingValue": "4.3", "reviewCount": "87"},
          "address": {"streetAddress": "서울특별시 중구 남대문로 12"},
          "image": ["https://img.example.com/a.jpg", "https://img.example.com/b.jpg"]
        }
        </script>
        </head><body></body></html>
        "#;

        let doc = Html::parse_document(html);
        let biz = business_record(&doc).expect("business record");
        assert_eq!(biz.name.as_deref(), Some("순대국 명가"));
        assert_eq!(biz.rating, Some(4.3));
        assert_eq!(biz.review_count, Some(87));
        assert_eq!(biz.address.as_deref(), Some("서울특별시 중구 남대문로 12"));
        assert_eq!(biz.image.as_deref(), Some("https://img.example.com/a.jpg"));
    }

    #[test]
    fn test_graph_wrapper_and_malformed_blocks() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">{not json}</script>
        <script type="application/ld+json">
        {"@graph": [{"@type": "Place", "name": "회현 칼국수"}]}
        </script>
        </head><body></body></html>
        "#;

        let doc = Html::parse_document(html);
        let biz = business_record(&doc).expect("record from @graph");
        assert_eq!(biz.name.as_deref(), Some("회현 칼국수"));
        assert_eq!(biz.rating, None);
    }

    #[test]
    fn test_no_structured_data() {
        let doc = Html::parse_document("<html><body><p>plain</p></body></html>");
        assert!(list_items(&doc).is_empty());
        assert!(business_record(&doc).is_none());
    }
}
