//! Which attributes reference cacheable external resources.

/// Attributes whose value may be replaced by a resolved local reference.
pub fn is_cacheable_attribute(tag: &str, attribute: &str) -> bool {
    match attribute {
        "src" => matches!(
            tag,
            "img" | "video" | "audio" | "source" | "track" | "embed" | "iframe" | "input"
        ),
        "srcset" => matches!(tag, "img" | "source"),
        "poster" => tag == "video",
        "href" => tag == "link",
        _ => false,
    }
}

pub fn is_cacheable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !url.starts_with("data:") && !url.starts_with("blob:")
}

/// Urls named by a `srcset` value, in order.
pub fn srcset_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Urls an attribute value references.
pub fn attribute_urls(attribute: &str, value: &str) -> Vec<String> {
    let urls = if attribute == "srcset" {
        srcset_urls(value)
    } else {
        vec![value.trim().to_string()]
    };
    urls.into_iter().filter(|u| is_cacheable_url(u)).collect()
}

/// Replaces every whole-url occurrence of `from` in a srcset value.
pub fn replace_srcset_url(value: &str, from: &str, to: &str) -> String {
    value
        .split(',')
        .map(|candidate| {
            let trimmed = candidate.trim_start();
            let lead = &candidate[..candidate.len() - trimmed.len()];
            match trimmed.split_once(char::is_whitespace) {
                Some((url, rest)) if url == from => format!("{lead}{to} {rest}"),
                None if trimmed == from => format!("{lead}{to}"),
                _ => candidate.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_media_and_links() {
        assert!(is_cacheable_attribute("img", "src"));
        assert!(is_cacheable_attribute("source", "srcset"));
        assert!(is_cacheable_attribute("video", "poster"));
        assert!(is_cacheable_attribute("link", "href"));
        assert!(!is_cacheable_attribute("a", "href"));
        assert!(!is_cacheable_attribute("div", "src"));
    }

    #[test]
    fn inline_urls_are_skipped() {
        assert!(attribute_urls("src", "data:image/png;base64,AAAA").is_empty());
        assert!(attribute_urls("src", "blob:http://x/1").is_empty());
        assert_eq!(
            attribute_urls("srcset", "a.png 1x, data:x 2x, b.png 3x"),
            vec!["a.png", "b.png"]
        );
    }

    #[test]
    fn srcset_replacement_keeps_descriptors() {
        assert_eq!(
            replace_srcset_url("a.png 1x, b.png 2x", "b.png", "local:b"),
            "a.png 1x, local:b 2x"
        );
        assert_eq!(replace_srcset_url("a.png", "a.png", "l"), "l");
    }
}
