use crate::error::{OrderError, Result, ValidationErrors};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl From<&OrderError> for ErrorBody {
    fn from(err: &OrderError) -> Self {
        let fields = match err {
            OrderError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        Self {
            kind: err.kind(),
            status: err.status_code(),
            message: err.to_string(),
            fields,
        }
    }
}

/// Outcome of one batch request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<&'static str>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(line: usize, op: &'static str, result: Value) -> Self {
        Self {
            line,
            op: Some(op),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(line: usize, op: Option<&'static str>, err: &OrderError) -> Self {
        Self {
            line,
            op,
            ok: false,
            result: None,
            error: Some(ErrorBody::from(err)),
        }
    }
}

/// Writes one JSON object per line.
pub struct ResponseWriter<W: Write> {
    sink: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        serde_json::to_writer(&mut self.sink, response)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_writes_one_object_per_line() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer
            .write_response(&Response::success(1, "reap", json!({"purged": 0})))
            .unwrap();
        writer
            .write_response(&Response::failure(
                2,
                Some("get_order"),
                &OrderError::NotFound("order ORD-1".into()),
            ))
            .unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["ok"], json!(true));
        assert_eq!(lines[0]["result"]["purged"], json!(0));
        assert_eq!(lines[1]["error"]["kind"], json!("not_found"));
        assert_eq!(lines[1]["error"]["status"], json!(404));
        assert!(lines[1].get("result").is_none());
    }

    #[test]
    fn test_validation_failure_lists_fields() {
        let err = OrderError::validation("customer.email", "is not a valid address");
        let body = ErrorBody::from(&err);
        assert_eq!(body.status, 400);
        assert_eq!(body.fields.unwrap().fields()[0].field, "customer.email");
    }
}
