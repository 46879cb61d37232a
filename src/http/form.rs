//! Form decoding module
//!
//! Reads a bounded request body and decodes form fields from it and from the
//! query string. Bodies may be `application/x-www-form-urlencoded` or
//! `multipart/form-data`; anything else carries no fields we understand.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use std::io::Cursor;

/// Failure while reading a request body
#[derive(Debug)]
pub enum BodyError {
    /// Body exceeded the configured maximum size
    TooLarge,
    /// Connection-level failure while receiving the body
    Read(String),
}

/// Failure while decoding form fields from a body
#[derive(Debug)]
pub enum FormError {
    /// Non-empty body in an encoding that is not a form
    Unsupported(String),
    /// Multipart body that does not parse
    Malformed(String),
}

/// Collect a request body, refusing anything longer than `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge),
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Decode the form fields of a request.
///
/// An empty body, or one without a `Content-Type`, is read as urlencoded.
pub async fn decode_form(
    query: Option<&str>,
    content_type: Option<&str>,
    body: Bytes,
) -> Result<FormData, FormError> {
    let Some(content_type) = content_type.filter(|_| !body.is_empty()) else {
        return Ok(FormData::parse(query, &body));
    };

    let mime = content_type.trim_start().to_ascii_lowercase();
    if mime.starts_with("application/x-www-form-urlencoded") {
        Ok(FormData::parse(query, &body))
    } else if mime.starts_with("multipart/form-data") {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| FormError::Malformed(e.to_string()))?;
        FormData::from_multipart(query, body, boundary)
            .await
            .map_err(|e| FormError::Malformed(e.to_string()))
    } else {
        Err(FormError::Unsupported(content_type.to_string()))
    }
}

/// Decoded form fields
#[derive(Debug, Default, Clone)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    /// Decode fields from the query string and an urlencoded body.
    /// Body fields come first so they win over query fields of the same name.
    pub fn parse(query: Option<&str>, body: &[u8]) -> Self {
        let mut form = Self {
            fields: form_urlencoded::parse(body).into_owned().collect(),
        };
        form.append_query(query);
        form
    }

    /// Text fields of a multipart body, then the query string.
    /// File parts are skipped.
    async fn from_multipart(
        query: Option<&str>,
        body: Bytes,
        boundary: String,
    ) -> multer::Result<Self> {
        let mut multipart = multer::Multipart::with_reader(Cursor::new(body), boundary);
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };
            fields.push((name, field.text().await?));
        }

        let mut form = Self { fields };
        form.append_query(query);
        Ok(form)
    }

    fn append_query(&mut self, query: Option<&str>) {
        if let Some(q) = query {
            self.fields
                .extend(form_urlencoded::parse(q.as_bytes()).into_owned());
        }
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First value for `name`, empty when the field is absent
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    const MULTIPART: &str = "multipart/form-data; boundary=X";

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Bytes {
        let mut body = String::new();
        for (name, file_name, value) in parts {
            body.push_str("--X\r\nContent-Disposition: form-data; name=\"");
            body.push_str(name);
            body.push('"');
            if let Some(file) = file_name {
                body.push_str(&format!("; filename=\"{file}\""));
            }
            body.push_str("\r\n\r\n");
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str("--X--\r\n");
        Bytes::from(body)
    }

    #[test]
    fn test_parse_body_fields() {
        let form = FormData::parse(None, b"title=Test&body=Hello+wiki%21%0Aline2");
        assert_eq!(form.get("title"), Some("Test"));
        assert_eq!(form.value("body"), "Hello wiki!\nline2");
        assert_eq!(form.get("missing"), None);
        assert_eq!(form.value("missing"), "");
    }

    #[test]
    fn test_body_wins_over_query() {
        let form = FormData::parse(Some("body=fromquery&title=Q"), b"body=frombody");
        assert_eq!(form.value("body"), "frombody");
        assert_eq!(form.value("title"), "Q");
    }

    #[tokio::test]
    async fn test_decode_urlencoded_with_and_without_content_type() {
        let typed = decode_form(
            None,
            Some("Application/X-WWW-Form-Urlencoded; charset=utf-8"),
            Bytes::from_static(b"body=a"),
        )
        .await
        .unwrap();
        assert_eq!(typed.value("body"), "a");

        let untyped = decode_form(None, None, Bytes::from_static(b"body=b"))
            .await
            .unwrap();
        assert_eq!(untyped.value("body"), "b");
    }

    #[tokio::test]
    async fn test_decode_multipart_text_fields() {
        let body = multipart_body(&[
            ("title", None, "Test"),
            ("upload", Some("notes.txt"), "file contents"),
            ("body", None, "Hello\r\nmultipart"),
        ]);
        let form = decode_form(Some("body=fromquery&extra=1"), Some(MULTIPART), body)
            .await
            .unwrap();
        assert_eq!(form.value("title"), "Test");
        assert_eq!(form.value("body"), "Hello\r\nmultipart");
        assert_eq!(form.value("extra"), "1");
        assert_eq!(form.get("upload"), None);
    }

    #[tokio::test]
    async fn test_decode_rejects_other_types_and_bad_multipart() {
        let json = decode_form(
            None,
            Some("application/json"),
            Bytes::from_static(b"{\"body\":\"x\"}"),
        )
        .await;
        assert!(matches!(json, Err(FormError::Unsupported(ref ct)) if ct == "application/json"));

        let no_boundary =
            decode_form(None, Some("multipart/form-data"), Bytes::from_static(b"x")).await;
        assert!(matches!(no_boundary, Err(FormError::Malformed(_))));

        let truncated = decode_form(
            None,
            Some(MULTIPART),
            Bytes::from_static(b"--X\r\nContent-Disposition: form-data; name=\"body\"\r\n\r\nHel"),
        )
        .await;
        assert!(matches!(truncated, Err(FormError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_empty_body_of_any_type_reads_query_only() {
        let form = decode_form(Some("title=Q"), Some("application/json"), Bytes::new())
            .await
            .unwrap();
        assert_eq!(form.value("title"), "Q");
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let ok = read_body(Full::new(Bytes::from_static(b"body=abc")), 16)
            .await
            .unwrap();
        assert_eq!(&ok[..], b"body=abc");

        let err = read_body(Full::new(Bytes::from_static(b"body=abcdefghijk")), 8).await;
        assert!(matches!(err, Err(BodyError::TooLarge)));
    }
}
