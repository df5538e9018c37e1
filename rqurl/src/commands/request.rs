use crate::cli::{Command, Context, Flag, ValidFlag};
use crate::commands::{missing_flag, parse_key_value, unknown_flag, DATA_FLAG};
use crate::error::{Error, Result};
use crate::query::{Method, Query};

/// Builds a query from flags, optionally saves it, then sends it.
pub struct RequestCmd;

const FLAGS: &[ValidFlag] = &[
    DATA_FLAG,
    ValidFlag {
        key: "header",
        labels: &["-h", "--header"],
    },
    ValidFlag {
        key: "json",
        labels: &["-j", "--json"],
    },
    ValidFlag {
        key: "save",
        labels: &["-s", "--save"],
    },
    ValidFlag {
        key: "url",
        labels: &["-u", "--url"],
    },
];

const HELP: &str = r#"
rqurl connect|delete|get|head|options|patch|post|put|trace --url <url> [--data key=value] [--header key=value] [--json true|false] [--save <name>]

  Send a request to the url given with --url.
    --url, -u: the URL to call, it may contain %{variable}% placeholders. Mandatory. Ex: --url https://example.com
    --data, -d: a key=value parameter. Sent in the body for POST, PUT and PATCH, in the query string otherwise. Repeatable. Ex: --data q=rust -d page=2
    --header, -h: a key=value request header. Repeatable. Ex: --header authorization="Bearer %{token}%"
    --json, -j: true to send the data as a JSON object with content-type application/json (unless a content-type header is given).
    --save, -s: save the query under this name, ex: demo/post/message. Nothing is saved or sent if the name is already taken."#;

fn parse_bool(raw: &str) -> Result<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::validation(format!(
            "the --json flag expects true or false, got {}",
            raw
        )))
    }
}

impl RequestCmd {
    /// Turn the parsed flags into a [`Query`] for `method`.
    pub fn build_query(method: Method, flags: &[Flag]) -> Result<Query> {
        let mut query = Query::new(method, "");
        let mut url = None;
        for flag in flags {
            match flag.key.as_str() {
                "data" => {
                    let (key, value) = parse_key_value(&flag.value, "--data", "help")?;
                    query.data.insert(key, value);
                }
                "header" => {
                    let (key, value) = parse_key_value(&flag.value, "--header", "help")?;
                    query.header.insert(key.to_lowercase(), value);
                }
                "json" => query.is_json = parse_bool(&flag.value)?,
                "save" => query.name = flag.value.clone(),
                "url" => url = Some(flag.value.clone()),
                other => return Err(unknown_flag(other, "help")),
            }
        }
        query.url = url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| missing_flag("--url", "help"))?;
        Ok(query)
    }
}

impl Command for RequestCmd {
    fn commands(&self) -> &'static [&'static str] {
        &[
            "connect", "delete", "get", "head", "options", "patch", "post", "put", "trace",
        ]
    }

    fn flags(&self) -> &'static [ValidFlag] {
        FLAGS
    }

    fn help(&self) -> &'static str {
        HELP
    }

    fn execute(
        &self,
        ctx: &mut Context<'_>,
        command: &str,
        _actions: &[String],
        flags: &[Flag],
    ) -> Result<String> {
        let query = Self::build_query(command.parse()?, flags)?;
        if !query.name.is_empty() {
            query.save(ctx.store)?;
            ctx.tree.insert_name(&query.name, query.method);
        }
        query.send(&ctx.env, ctx.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::JSON_CONTENT_TYPE;

    fn flags(pairs: &[(&str, &str)]) -> Vec<Flag> {
        pairs.iter().map(|(k, v)| Flag::new(*k, *v)).collect()
    }

    #[test]
    fn test_build_query_collects_flags() {
        let query = RequestCmd::build_query(
            Method::Post,
            &flags(&[
                ("url", "http://%{host}%/items"),
                ("data", "Title=a=b"),
                ("header", "X-Trace=1"),
                ("json", "TRUE"),
                ("save", "demo/post"),
            ]),
        )
        .unwrap();
        assert_eq!(query.url, "http://%{host}%/items");
        assert_eq!(query.data["Title"], "a=b");
        assert_eq!(query.header["x-trace"], "1");
        assert!(query.is_json);
        assert_eq!(query.name, "demo/post");
    }

    #[test]
    fn test_build_query_requires_url() {
        let err = RequestCmd::build_query(Method::Get, &flags(&[("data", "a=1")])).unwrap_err();
        assert!(err.to_string().contains("--url"));
    }

    #[test]
    fn test_build_query_rejects_foreign_flag() {
        let err = RequestCmd::build_query(
            Method::Get,
            &flags(&[("url", "http://x/"), ("name", "oops")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_build_query_rejects_bad_json_value() {
        let err = RequestCmd::build_query(
            Method::Post,
            &flags(&[("url", "http://x/"), ("json", "yes")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--json"));
    }

    #[test]
    fn test_content_type_header_given_in_any_case_is_kept() {
        let query = RequestCmd::build_query(
            Method::Post,
            &flags(&[
                ("url", "http://x/"),
                ("data", "a=1"),
                ("json", "true"),
                ("header", "Content-Type=text/plain"),
            ]),
        )
        .unwrap();
        let env = crate::environment::Environment::new("default", "");
        let req = query.build_request(&env).unwrap();
        assert_eq!(req.headers[http::header::CONTENT_TYPE], "text/plain");
        assert_ne!(req.headers[http::header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }
}
