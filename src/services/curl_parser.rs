// pagesnap cURL Import
// Turns a pasted cURL command into an upload `HttpConfig`, renders a config
// back into an equivalent command, and validates configs before they are saved.

use tracing::debug;

use crate::types::errors::CurlError;
use crate::types::scenario::{BodyTemplate, HttpConfig, HttpMethod, KeyValue, DEFAULT_TIMEOUT_SECS};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Flags whose argument is skipped because it has no meaning for uploads.
const IGNORED_FLAGS_WITH_ARG: &[&str] = &[
    "-u", "--user", "-o", "--output", "-A", "--user-agent", "-e", "--referer", "-b",
    "--cookie", "-x", "--proxy", "--connect-timeout", "-F", "--form",
];

/// Parses a cURL command line.
///
/// Understands `-X/--request`, `-H/--header`, `-d/--data/--data-raw/
/// --data-binary/--data-urlencode` (several are joined with `&`), `--json`,
/// `-m/--max-time` and `--url`. The first `http(s)://` argument is the URL.
pub fn parse(command: &str) -> Result<HttpConfig, CurlError> {
    let command = command.trim();
    if command.is_empty() {
        return Err(CurlError::Empty);
    }
    let joined = command.replace("\\\r\n", " ").replace("\\\n", " ");
    let tokens = shlex::split(&joined).ok_or(CurlError::UnterminatedQuote)?;

    let mut iter = tokens.into_iter().peekable();
    if iter.peek().map(|t| t == "curl").unwrap_or(false) {
        iter.next();
    }

    let mut url: Option<String> = None;
    let mut method: Option<HttpMethod> = None;
    let mut headers = Vec::new();
    let mut content_type: Option<String> = None;
    let mut data: Vec<String> = Vec::new();
    let mut json: Option<String> = None;
    let mut timeout_secs = DEFAULT_TIMEOUT_SECS;

    while let Some(token) = iter.next() {
        // `--long=value` is the same as `--long value`.
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) if token.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (token.clone(), None),
        };
        let mut argument = |flag: &str| -> Result<String, CurlError> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => iter
                    .next()
                    .ok_or_else(|| CurlError::MissingArgument(flag.to_string())),
            }
        };

        match flag.as_str() {
            "-X" | "--request" => {
                let value = argument(&flag)?;
                match HttpMethod::parse(&value) {
                    Some(m) => method = Some(m),
                    None => debug!(method = %value, "ignoring unsupported method"),
                }
            }
            "-H" | "--header" => {
                let value = argument(&flag)?;
                if let Some((key, val)) = value.split_once(':') {
                    let (key, val) = (key.trim(), val.trim());
                    if key.is_empty() {
                        continue;
                    }
                    if key.eq_ignore_ascii_case("content-type") {
                        content_type = Some(val.to_string());
                    } else {
                        headers.push(KeyValue::new(key, val));
                    }
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-urlencode"
            | "--data-ascii" => data.push(argument(&flag)?),
            "--json" => json = Some(argument(&flag)?),
            "-m" | "--max-time" => {
                let value = argument(&flag)?;
                if let Ok(secs) = value.parse::<f64>() {
                    if secs > 0.0 {
                        timeout_secs = secs.ceil() as u64;
                    }
                }
            }
            "--url" => url = Some(argument(&flag)?),
            f if IGNORED_FLAGS_WITH_ARG.contains(&f) => {
                argument(&flag)?;
            }
            f if f.starts_with('-') => {}
            _ => {
                if url.is_none() && (token.starts_with("http://") || token.starts_with("https://")) {
                    url = Some(token);
                }
            }
        }
    }

    let url = url.ok_or(CurlError::MissingUrl)?;

    let body = match json {
        Some(template) => BodyTemplate::Json { template },
        None if !data.is_empty() => body_from_data(&data.join("&"), content_type.as_deref()),
        None => {
            if let Some(ct) = &content_type {
                headers.push(KeyValue::new("Content-Type", ct));
            }
            BodyTemplate::None
        }
    };
    let method = match method {
        Some(m) => m,
        None if body != BodyTemplate::None => HttpMethod::Post,
        None => HttpMethod::Get,
    };

    Ok(HttpConfig {
        method,
        url,
        headers,
        body,
        timeout_secs,
    })
}

fn body_from_data(data: &str, content_type: Option<&str>) -> BodyTemplate {
    let essence = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some(JSON_CONTENT_TYPE) => BodyTemplate::Json {
            template: data.to_string(),
        },
        Some(FORM_CONTENT_TYPE) => BodyTemplate::FormUrlEncoded {
            fields: parse_form(data),
        },
        Some(_) => BodyTemplate::Raw {
            content_type: content_type.unwrap_or_default().to_string(),
            template: data.to_string(),
        },
        None => {
            let is_json = serde_json::from_str::<serde_json::Value>(data)
                .map(|v| v.is_object() || v.is_array())
                .unwrap_or(false);
            if is_json {
                BodyTemplate::Json {
                    template: data.to_string(),
                }
            } else if data.contains('=') {
                BodyTemplate::FormUrlEncoded {
                    fields: parse_form(data),
                }
            } else {
                // curl sends bare -d data as a form body.
                BodyTemplate::Raw {
                    content_type: FORM_CONTENT_TYPE.to_string(),
                    template: data.to_string(),
                }
            }
        }
    }
}

fn parse_form(data: &str) -> Vec<KeyValue> {
    data.split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            if key.is_empty() {
                None
            } else {
                Some(KeyValue {
                    key,
                    value: decode_component(value),
                })
            }
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|c| c.into_owned())
        .unwrap_or(s)
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Renders `config` as a multi-line cURL command.
pub fn render(config: &HttpConfig) -> String {
    let mut curl = String::from("curl");
    if config.method != HttpMethod::Get {
        curl.push_str(&format!(" -X {}", config.method));
    }
    curl.push_str(&format!(" {}", quote(&config.url)));

    for header in config.headers.iter().filter(|h| !h.key.is_empty()) {
        curl.push_str(&format!(
            " \\\n  -H {}",
            quote(&format!("{}: {}", header.key, header.value))
        ));
    }

    if config.method != HttpMethod::Get {
        let (content_type, data) = match &config.body {
            BodyTemplate::None => (None, None),
            BodyTemplate::Json { template } => (Some(JSON_CONTENT_TYPE.to_string()), Some(template.clone())),
            BodyTemplate::FormUrlEncoded { fields } => {
                let encoded = fields
                    .iter()
                    .map(|f| format!("{}={}", urlencoding::encode(&f.key), urlencoding::encode(&f.value)))
                    .collect::<Vec<_>>()
                    .join("&");
                (Some(FORM_CONTENT_TYPE.to_string()), Some(encoded))
            }
            BodyTemplate::Raw {
                content_type,
                template,
            } => (Some(content_type.clone()), Some(template.clone())),
        };
        if let Some(ct) = content_type {
            curl.push_str(&format!(" \\\n  -H {}", quote(&format!("Content-Type: {}", ct))));
        }
        if let Some(data) = data {
            curl.push_str(&format!(" \\\n  -d {}", quote(&data)));
        }
    }

    if config.timeout_secs != DEFAULT_TIMEOUT_SECS {
        curl.push_str(&format!(" \\\n  -m {}", config.timeout_secs));
    }
    curl
}

/// Checks that `config` can be sent. Returns a user-facing message otherwise.
pub fn validate_config(config: &HttpConfig) -> Result<(), String> {
    if config.url.trim().is_empty() {
        return Err("URL cannot be empty".to_string());
    }
    let parsed = url::Url::parse(config.url.trim()).map_err(|e| format!("Invalid URL: {}", e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Unsupported URL scheme: {}", parsed.scheme()));
    }
    if config.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".to_string());
    }
    if config.headers.iter().any(|h| h.key.trim().is_empty()) {
        return Err("Header name cannot be empty".to_string());
    }
    if let BodyTemplate::Raw { content_type, .. } = &config.body {
        if content_type.trim().is_empty() {
            return Err("Raw body needs a content type".to_string());
        }
    }
    Ok(())
}
