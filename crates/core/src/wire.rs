//! Decoding of search endpoint responses
//!
//! The endpoint answers with a JSON object:
//!
//! ```text
//! { "items": [ {"id": "...", ...}, ... ],
//!   "totalPages": 12,
//!   "facetCounts": { "color": { "red": 4, "blue": 2 } } }
//! ```
//!
//! `hits`, `nbPages` and `facets` are accepted as alternative names, and item
//! identifiers may be given as `id` or `objectID`, as a string or a number.
//!
//! [`decode_page`] is strict and reports what is wrong. [`ResultPage::from_wire`]
//! is what the result stream uses: a body without an items array or a page
//! count becomes the empty page, which marks the session exhausted instead of
//! retrying forever. Bad individual items and facet entries are skipped.

use crate::error::{StreamError, StreamResult};
use crate::search_types::{FacetCounts, ResultItem, ResultPage};
use serde_json::{Map, Value};
use tracing::warn;

const ITEM_KEYS: [&str; 2] = ["items", "hits"];
const TOTAL_PAGES_KEYS: [&str; 3] = ["totalPages", "nbPages", "total_pages"];
const FACET_KEYS: [&str; 3] = ["facetCounts", "facets", "facet_counts"];
const ID_KEYS: [&str; 2] = ["id", "objectID"];

fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

/// Items array, page count and raw facets of a response body
struct Envelope<'a> {
    raw_items: &'a [Value],
    total_pages: u32,
    raw_facets: Option<&'a Value>,
}

fn decode_envelope(body: &Value) -> StreamResult<Envelope<'_>> {
    let object = body
        .as_object()
        .ok_or_else(|| StreamError::malformed("response body is not an object"))?;

    let raw_items = first_of(object, &ITEM_KEYS)
        .ok_or_else(|| StreamError::malformed("missing items array"))?
        .as_array()
        .ok_or_else(|| StreamError::malformed("items is not an array"))?;

    let total_pages = first_of(object, &TOTAL_PAGES_KEYS)
        .ok_or_else(|| StreamError::malformed("missing totalPages"))?
        .as_u64()
        .ok_or_else(|| StreamError::malformed("totalPages is not a non-negative integer"))?;
    let total_pages = u32::try_from(total_pages)
        .map_err(|_| StreamError::malformed(format!("totalPages {} out of range", total_pages)))?;

    Ok(Envelope {
        raw_items,
        total_pages,
        raw_facets: first_of(object, &FACET_KEYS),
    })
}

/// Decides what a bad item or facet entry does: `Err` aborts, `Ok` skips it
type OnBadEntry<'a> = &'a mut dyn FnMut(StreamError) -> StreamResult<()>;

fn decode_body(envelope: Envelope<'_>, on_bad: OnBadEntry<'_>) -> StreamResult<ResultPage> {
    let mut items = Vec::with_capacity(envelope.raw_items.len());
    for (position, raw) in envelope.raw_items.iter().enumerate() {
        match decode_item(position, raw) {
            Ok(item) => items.push(item),
            Err(e) => on_bad(e)?,
        }
    }

    let facet_counts = match envelope.raw_facets {
        Some(raw) => decode_facets(raw, on_bad)?,
        None => FacetCounts::new(),
    };

    Ok(ResultPage {
        items,
        total_pages: envelope.total_pages,
        facet_counts,
    })
}

/// Decode a response body, failing on any structural problem
///
/// # Errors
///
/// Returns [`StreamError::MalformedResponse`] if the body is not an object, if
/// the items array or the total page count is missing or mistyped, if an item
/// lacks an identifier, or if a facet count is not a non-negative integer.
pub fn decode_page(body: &Value) -> StreamResult<ResultPage> {
    let mut fail = |e: StreamError| -> StreamResult<()> { Err(e) };
    decode_body(decode_envelope(body)?, &mut fail)
}

fn decode_item(position: usize, raw: &Value) -> StreamResult<ResultItem> {
    let object = raw
        .as_object()
        .ok_or_else(|| StreamError::malformed(format!("item {} is not an object", position)))?;

    let id = match first_of(object, &ID_KEYS) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(StreamError::malformed(format!(
                "item {} has no identifier",
                position
            )))
        }
    };

    let fields = object
        .iter()
        .filter(|(key, _)| !ID_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(ResultItem { id, fields })
}

fn decode_facets(raw: &Value, on_bad: OnBadEntry<'_>) -> StreamResult<FacetCounts> {
    let mut counts = FacetCounts::new();
    let Some(object) = raw.as_object() else {
        on_bad(StreamError::malformed("facet counts are not an object"))?;
        return Ok(counts);
    };

    for (field, values) in object {
        let Some(values) = values.as_object() else {
            on_bad(StreamError::malformed(format!(
                "facet '{}' counts are not an object",
                field
            )))?;
            continue;
        };
        for (value, count) in values {
            match count.as_u64() {
                Some(count) => {
                    counts
                        .entry(field.clone())
                        .or_default()
                        .insert(value.clone(), count);
                }
                None => on_bad(StreamError::malformed(format!(
                    "facet '{}={}' count is not an integer",
                    field, value
                )))?,
            }
        }
    }
    Ok(counts)
}

impl ResultPage {
    /// Decode a response body leniently
    ///
    /// Only a body without an items array or a page count is replaced by
    /// [`ResultPage::empty`], so the session ends as exhausted. Items without
    /// an identifier and unusable facet entries are logged and skipped; the
    /// rest of the page is kept.
    pub fn from_wire(body: &Value) -> ResultPage {
        let envelope = match decode_envelope(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(target: "facetstream::wire", error = %e, "Treating malformed response as an empty final page");
                return ResultPage::empty();
            }
        };

        let mut skip = |e: StreamError| -> StreamResult<()> {
            warn!(target: "facetstream::wire", error = %e, "Skipping unusable entry in response");
            Ok(())
        };
        // `skip` never aborts
        decode_body(envelope, &mut skip).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_page() {
        let body = json!({
            "items": [
                {"id": "a", "title": "Silk saree", "price": 4999},
                {"id": "b", "title": "Cotton saree"}
            ],
            "totalPages": 3,
            "facetCounts": {"color": {"red": 4, "blue": 2}}
        });
        let page = decode_page(&body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "a");
        assert_eq!(page.items[0].field("price"), Some(&json!(4999)));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.facet_counts["color"]["red"], 4);
    }

    #[test]
    fn test_decode_alternative_names() {
        let body = json!({
            "hits": [{"objectID": 42, "title": "x"}],
            "nbPages": 1,
            "facets": {"size": {"m": 1}}
        });
        let page = decode_page(&body).unwrap();
        assert_eq!(page.items[0].id, "42");
        assert!(page.items[0].field("objectID").is_none());
        assert_eq!(page.facet_counts["size"]["m"], 1);
    }

    #[test]
    fn test_decode_missing_facets_is_fine() {
        let page = decode_page(&json!({"items": [], "totalPages": 0})).unwrap();
        assert!(page.facet_counts.is_empty());
    }

    #[test]
    fn test_decode_missing_items_fails() {
        let err = decode_page(&json!({"totalPages": 2})).unwrap_err();
        assert!(err.to_string().contains("missing items"));
    }

    #[test]
    fn test_decode_missing_total_pages_fails() {
        let err = decode_page(&json!({"items": []})).unwrap_err();
        assert!(err.to_string().contains("totalPages"));
    }

    #[test]
    fn test_decode_item_without_id_fails() {
        let err = decode_page(&json!({"items": [{"title": "x"}], "totalPages": 1})).unwrap_err();
        assert!(err.to_string().contains("item 0"));
    }

    #[test]
    fn test_decode_bad_facet_count_fails() {
        let body = json!({"items": [], "totalPages": 1, "facetCounts": {"color": {"red": 4.0}}});
        let err = decode_page(&body).unwrap_err();
        assert!(err.to_string().contains("color=red"));
    }

    #[test]
    fn test_from_wire_keeps_page_around_bad_facet_count() {
        let body = json!({
            "items": [{"id": "a"}, {"id": "b"}],
            "totalPages": 5,
            "facetCounts": {"color": {"red": 4.0, "blue": 3}, "size": "many"}
        });
        let page = ResultPage::from_wire(&body);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.facet_counts["color"].len(), 1);
        assert_eq!(page.facet_counts["color"]["blue"], 3);
        assert!(!page.facet_counts.contains_key("size"));
    }

    #[test]
    fn test_from_wire_skips_item_without_id() {
        let body = json!({
            "items": [{"id": "a"}, {"title": "no id"}, "junk", {"objectID": 7}],
            "totalPages": 2
        });
        let page = ResultPage::from_wire(&body);
        let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "7"]);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_from_wire_facets_not_an_object() {
        let body = json!({"items": [{"id": "a"}], "totalPages": 1, "facets": []});
        let page = ResultPage::from_wire(&body);
        assert_eq!(page.items.len(), 1);
        assert!(page.facet_counts.is_empty());
    }

    #[test]
    fn test_from_wire_malformed_is_empty_page() {
        assert_eq!(ResultPage::from_wire(&json!("oops")), ResultPage::empty());
        assert_eq!(ResultPage::from_wire(&json!({"items": []})), ResultPage::empty());
        assert_eq!(
            ResultPage::from_wire(&json!({"items": 3, "totalPages": 2})),
            ResultPage::empty()
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn json_value() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                "[a-z]{0,6}".prop_map(Value::from),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::btree_map(
                        prop_oneof![
                            Just("items".to_string()),
                            Just("totalPages".to_string()),
                            Just("facets".to_string()),
                            Just("id".to_string()),
                            "[a-z]{1,4}",
                        ],
                        inner,
                        0..4
                    )
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        proptest! {
            #[test]
            fn prop_from_wire_accepts_any_body(body in json_value()) {
                let page = ResultPage::from_wire(&body);
                match decode_page(&body) {
                    Ok(strict) => prop_assert_eq!(page, strict),
                    Err(_) if decode_envelope(&body).is_err() => {
                        prop_assert_eq!(page, ResultPage::empty())
                    }
                    Err(_) => {
                        let raw_items = decode_envelope(&body)
                            .map(|e| e.raw_items.len())
                            .unwrap_or(0);
                        prop_assert!(page.items.len() <= raw_items);
                    }
                }
            }

            #[test]
            fn prop_decoded_ids_keep_order(ids in prop::collection::vec("[a-z0-9]{1,8}", 0..20)) {
                let items: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
                let page = decode_page(&json!({ "items": items, "totalPages": 1 })).unwrap();
                let decoded: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
                prop_assert_eq!(decoded, ids.iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }
}
