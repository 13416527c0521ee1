//! Parsing of `207 Multi-Status` PROPFIND responses.
//!
//! Servers disagree on namespace prefixes (`d:`, `D:`, none), so elements are
//! matched by local name only. Only properties inside a `200` propstat are
//! taken into account.

use crate::entry::{DIR_MODE, FILE_MODE, RemoteEntry};
use crate::error::{DavError, DavResult};
use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::time::SystemTime;
use tracing::trace;

/// PROPFIND request body asking for the properties we translate.
pub(crate) const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getcontenttype/>
    <d:getetag/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

#[derive(Debug, Clone, Copy)]
enum Field {
    Href,
    Status,
    ContentLength,
    LastModified,
    ContentType,
    ETag,
}

#[derive(Debug, Default)]
struct PropStat {
    status: Option<String>,
    is_collection: bool,
    content_length: Option<String>,
    last_modified: Option<String>,
    content_type: Option<String>,
    etag: Option<String>,
}

impl PropStat {
    fn is_ok(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.split_whitespace().nth(1) == Some("200"))
    }
}

#[derive(Debug, Default)]
struct Response {
    href: Option<String>,
    props: PropStat,
}

impl Response {
    fn merge(&mut self, ps: PropStat) {
        self.props.is_collection |= ps.is_collection;
        self.props.content_length = ps.content_length.or(self.props.content_length.take());
        self.props.last_modified = ps.last_modified.or(self.props.last_modified.take());
        self.props.content_type = ps.content_type.or(self.props.content_type.take());
        self.props.etag = ps.etag.or(self.props.etag.take());
    }

    fn build(self, base_path: &str) -> DavResult<RemoteEntry> {
        let href = self
            .href
            .ok_or_else(|| DavError::InvalidResponse("response without href".to_string()))?;
        let mut path = share_relative(&href, base_path);
        let is_dir = self.props.is_collection;
        if is_dir && !path.ends_with('/') {
            path.push('/');
        }

        let size = match self.props.content_length.as_deref() {
            Some(len) if !is_dir => len.trim().parse::<u64>().map_err(|_| {
                DavError::InvalidResponse(format!("bad getcontentlength {len:?} for {href}"))
            })?,
            _ => 0,
        };

        let modified = self
            .props
            .last_modified
            .as_deref()
            .and_then(parse_http_date)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        Ok(RemoteEntry {
            path,
            size,
            mode: if is_dir { DIR_MODE } else { FILE_MODE },
            modified,
            is_dir,
            content_type: self.props.content_type,
            etag: self.props.etag,
        })
    }
}

/// Parse an RFC 1123 date as used by `getlastmodified`.
fn parse_http_date(s: &str) -> Option<SystemTime> {
    match chrono::DateTime::parse_from_rfc2822(s.trim()) {
        Ok(dt) => Some(SystemTime::from(dt)),
        Err(e) => {
            trace!(value = %s, error = %e, "unparsable getlastmodified");
            None
        }
    }
}

/// Turn an href into a decoded path relative to the share root, with a
/// leading `/`.
///
/// `base_path` is the (still encoded) URL path of the share root.
pub(crate) fn share_relative(href: &str, base_path: &str) -> String {
    let href_path = match url::Url::parse(href) {
        Ok(u) => u.path().to_string(),
        Err(_) => href.to_string(),
    };
    let decoded = percent_decode_str(&href_path).decode_utf8_lossy();
    let base = percent_decode_str(base_path).decode_utf8_lossy();
    let base = base.trim_end_matches('/');

    let rel = decoded.strip_prefix(base).unwrap_or(&*decoded);
    format!("/{}", rel.trim_start_matches('/'))
}

/// Parse a multistatus body into entries, in document order.
pub(crate) fn parse(body: &str, base_path: &str) -> DavResult<Vec<RemoteEntry>> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut response: Option<Response> = None;
    let mut propstat: Option<PropStat> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                field = match e.local_name().as_ref() {
                    b"response" => {
                        response = Some(Response::default());
                        None
                    }
                    b"propstat" => {
                        propstat = Some(PropStat::default());
                        None
                    }
                    b"collection" => {
                        if let Some(ps) = propstat.as_mut() {
                            ps.is_collection = true;
                        }
                        None
                    }
                    b"href" => Some(Field::Href),
                    b"status" => Some(Field::Status),
                    b"getcontentlength" => Some(Field::ContentLength),
                    b"getlastmodified" => Some(Field::LastModified),
                    b"getcontenttype" => Some(Field::ContentType),
                    b"getetag" => Some(Field::ETag),
                    _ => None,
                };
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"collection"
                    && let Some(ps) = propstat.as_mut()
                {
                    ps.is_collection = true;
                }
            }
            Event::Text(t) => {
                let Some(f) = field else { continue };
                let text = t
                    .unescape()
                    .map_err(|e| DavError::InvalidResponse(e.to_string()))?
                    .into_owned();
                match (f, response.as_mut(), propstat.as_mut()) {
                    (Field::Href, Some(r), _) if r.href.is_none() => r.href = Some(text),
                    (Field::Status, _, Some(ps)) => ps.status = Some(text),
                    (Field::ContentLength, _, Some(ps)) => ps.content_length = Some(text),
                    (Field::LastModified, _, Some(ps)) => ps.last_modified = Some(text),
                    (Field::ContentType, _, Some(ps)) => ps.content_type = Some(text),
                    (Field::ETag, _, Some(ps)) => ps.etag = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"propstat" => {
                        if let (Some(r), Some(ps)) = (response.as_mut(), propstat.take())
                            && ps.is_ok()
                        {
                            r.merge(ps);
                        }
                    }
                    b"response" => {
                        if let Some(r) = response.take() {
                            entries.push(r.build(base_path)?);
                        }
                    }
                    _ => {}
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const BASE: &str = "/public.php/dav/files/AbC123/";

    const LISTING: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:s="http://sabredav.org/ns" xmlns:oc="http://owncloud.org/ns">
 <d:response>
  <d:href>/public.php/dav/files/AbC123/</d:href>
  <d:propstat>
   <d:prop>
    <d:resourcetype><d:collection/></d:resourcetype>
    <d:getlastmodified>Tue, 15 Nov 1994 12:45:26 GMT</d:getlastmodified>
   </d:prop>
   <d:status>HTTP/1.1 200 OK</d:status>
  </d:propstat>
 </d:response>
 <d:response>
  <d:href>/public.php/dav/files/AbC123/a.txt</d:href>
  <d:propstat>
   <d:prop>
    <d:resourcetype/>
    <d:getcontentlength>11</d:getcontentlength>
    <d:getcontenttype>text/plain</d:getcontenttype>
    <d:getetag>"5f2e"</d:getetag>
    <d:getlastmodified>Tue, 15 Nov 1994 12:45:26 GMT</d:getlastmodified>
   </d:prop>
   <d:status>HTTP/1.1 200 OK</d:status>
  </d:propstat>
  <d:propstat>
   <d:prop><d:displayname/></d:prop>
   <d:status>HTTP/1.1 404 Not Found</d:status>
  </d:propstat>
 </d:response>
 <d:response>
  <d:href>/public.php/dav/files/AbC123/My%20Docs/</d:href>
  <d:propstat>
   <d:prop>
    <d:resourcetype><d:collection/></d:resourcetype>
   </d:prop>
   <d:status>HTTP/1.1 200 OK</d:status>
  </d:propstat>
 </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_listing_in_document_order() {
        let entries = parse(LISTING, BASE).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].path, "/");
        assert!(entries[0].is_dir);

        assert_eq!(entries[1].path, "/a.txt");
        assert!(!entries[1].is_dir);
        assert_eq!(entries[1].size, 11);
        assert_eq!(entries[1].mode, FILE_MODE);
        assert_eq!(entries[1].content_type.as_deref(), Some("text/plain"));
        assert_eq!(entries[1].etag.as_deref(), Some("\"5f2e\""));
        assert_eq!(
            entries[1].modified,
            SystemTime::UNIX_EPOCH + Duration::from_secs(784_903_526)
        );

        assert_eq!(entries[2].path, "/My Docs/");
        assert!(entries[2].is_dir);
        assert_eq!(entries[2].mode, DIR_MODE);
        assert_eq!(entries[2].modified, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_uppercase_prefix_and_absolute_href() {
        let body = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:">
 <D:response>
  <D:href>https://cloud.example.com/public.php/dav/files/AbC123/notes.md</D:href>
  <D:propstat>
   <D:prop><D:getcontentlength>3</D:getcontentlength><D:resourcetype/></D:prop>
   <D:status>HTTP/1.1 200 OK</D:status>
  </D:propstat>
 </D:response>
</D:multistatus>"#;
        let entries = parse(body, BASE).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/notes.md");
        assert_eq!(entries[0].size, 3);
    }

    #[test]
    fn test_bad_content_length_is_an_error() {
        let body = r#"<d:multistatus xmlns:d="DAV:"><d:response>
<d:href>/public.php/dav/files/AbC123/x</d:href>
<d:propstat><d:prop><d:getcontentlength>lots</d:getcontentlength></d:prop>
<d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#;
        assert!(matches!(
            parse(body, BASE),
            Err(DavError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unclosed_document_is_an_error() {
        let body = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/x</d:href></d:propstat>"#;
        assert!(parse(body, BASE).is_err());
    }

    #[test]
    fn test_share_relative_decodes_and_strips_base() {
        assert_eq!(
            share_relative("/public.php/dav/files/AbC123/a%20b/c.txt", BASE),
            "/a b/c.txt"
        );
        assert_eq!(share_relative("/public.php/dav/files/AbC123", BASE), "/");
        assert_eq!(share_relative("/elsewhere/x", BASE), "/elsewhere/x");
    }
}
