use std::collections::HashMap;

use crate::request::Request;

/// Name of the pseudo-variable composed from the other build metadata.
pub const BUILD_URL: &str = "BUILD_URL";

/// Source of variable values for message expansion.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the running process, read at lookup time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Link to the running build in the Concourse web UI.
fn build_url<E: Environment + ?Sized>(env: &E) -> String {
    let get = |name: &str| env.var(name).unwrap_or_default();
    format!(
        "{}/teams/{}/pipelines/{}/jobs/{}/builds/{}",
        get("ATC_EXTERNAL_URL"),
        get("BUILD_TEAM_NAME"),
        get("BUILD_PIPELINE_NAME"),
        get("BUILD_JOB_NAME"),
        get("BUILD_NAME"),
    )
}

fn lookup<E: Environment + ?Sized>(env: &E, name: &str) -> String {
    if name == BUILD_URL {
        return build_url(env);
    }
    env.var(name).unwrap_or_default()
}

/// Expand `$NAME` and `${NAME}` references in the message template using the
/// process environment.
#[allow(dead_code)]
pub fn expand_message(request: &Request) -> String {
    expand_message_with(request, &ProcessEnv)
}

/// Expand the message template against `env`.
///
/// Unset variables expand to an empty string. Substituted values are not
/// expanded again.
pub fn expand_message_with<E: Environment + ?Sized>(request: &Request, env: &E) -> String {
    shellexpand::env_with_context_no_errors(&request.params.message, |name: &str| {
        Some(lookup(env, name))
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Params, Source};

    fn request(message: &str) -> Request {
        Request {
            source: Source {
                server: "chat.freenode.net".to_string(),
                port: 7070,
                channel: "#random".to_string(),
                user: "randobot1337".to_string(),
                password: "secretsecret".to_string(),
                use_tls: true,
                join: false,
            },
            params: Params {
                message: message.to_string(),
                dry_run: true,
            },
        }
    }

    fn build_env() -> HashMap<String, String> {
        [
            ("BUILD_ID", "id-123"),
            ("BUILD_NAME", "name-asdf"),
            ("BUILD_JOB_NAME", "job-name-asdf"),
            ("BUILD_PIPELINE_NAME", "pipeline-name-asdf"),
            ("BUILD_TEAM_NAME", "team-name-asdf"),
            ("ATC_EXTERNAL_URL", "https://ci.example.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_expands_environment_variables() {
        let message = expand_message_with(&request(">> $BUILD_ID <<"), &build_env());
        assert_eq!(message, ">> id-123 <<");
    }

    #[test]
    fn test_expands_braced_variables() {
        let message = expand_message_with(&request(">> ${BUILD_ID}-x <<"), &build_env());
        assert_eq!(message, ">> id-123-x <<");
    }

    #[test]
    fn test_expands_build_url() {
        let message = expand_message_with(&request(">> $BUILD_URL <<"), &build_env());
        assert_eq!(
            message,
            ">> https://ci.example.com/teams/team-name-asdf/pipelines/pipeline-name-asdf/jobs/job-name-asdf/builds/name-asdf <<"
        );
    }

    #[test]
    fn test_build_url_overrides_environment() {
        let mut env = build_env();
        env.insert("BUILD_URL".to_string(), "http://elsewhere".to_string());
        let message = expand_message_with(&request("${BUILD_URL}"), &env);
        assert!(message.starts_with("https://ci.example.com/teams/"));
    }

    #[test]
    fn test_unset_variables_expand_to_empty() {
        let message = expand_message_with(&request("a${NOPE}b $NOPE c"), &build_env());
        assert_eq!(message, "ab  c");
    }

    #[test]
    fn test_build_url_with_missing_parts() {
        let message = expand_message_with(&request("$BUILD_URL"), &HashMap::new());
        assert_eq!(message, "/teams//pipelines//jobs//builds/");
    }

    #[test]
    fn test_unterminated_brace_is_literal() {
        let env = HashMap::from([("A".to_string(), "x".to_string())]);
        assert_eq!(expand_message_with(&request("a ${A"), &env), "a ${A");
        assert_eq!(expand_message_with(&request("${A"), &env), "${A");
    }

    #[test]
    fn test_double_dollar_escapes_reference() {
        let env = HashMap::from([("A".to_string(), "x".to_string())]);
        assert_eq!(expand_message_with(&request("cost $$A"), &env), "cost $A");
    }

    #[test]
    fn test_expansion_is_single_pass() {
        let mut env = build_env();
        env.insert("NESTED".to_string(), "$BUILD_ID".to_string());
        let message = expand_message_with(&request("$NESTED"), &env);
        assert_eq!(message, "$BUILD_ID");
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let message = expand_message_with(&request("deploy finished"), &build_env());
        assert_eq!(message, "deploy finished");
    }

    #[test]
    fn test_reads_environment_on_each_call() {
        let mut env = build_env();
        let req = request("$BUILD_URL");
        let first = expand_message_with(&req, &env);
        env.insert("BUILD_NAME".to_string(), "42".to_string());
        let second = expand_message_with(&req, &env);
        assert!(first.ends_with("/builds/name-asdf"));
        assert!(second.ends_with("/builds/42"));
    }

    #[test]
    fn test_process_env() {
        std::env::set_var("IRC_NOTIFICATION_RESOURCE_TEST_VAR", "from-process");
        let message = expand_message(&request("got $IRC_NOTIFICATION_RESOURCE_TEST_VAR"));
        assert_eq!(message, "got from-process");
    }
}
