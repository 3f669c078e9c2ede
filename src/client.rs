use std::fmt;
use std::time::SystemTime;

use serde_json::Value;

use crate::{
    request::json_kind,
    sleep::{Sleeper, ThreadSleeper},
    transport::{RawResponse, ReqwestTransport, Transport},
    Attempt, AttemptOutcome, ClientOptions, JsonMap, Request, Result, RetryOn, RetryPolicy,
    SimplismartError, Submission,
};

/// Blocking client that delivers [`Request`]s with bounded retries.
///
/// Holds no per-request state; one client may be shared across threads.
#[derive(Clone)]
pub struct SimplismartClient<T = ReqwestTransport, S = ThreadSleeper> {
    pub(crate) transport: T,
    pub(crate) sleeper: S,
}

impl<T, S> fmt::Debug for SimplismartClient<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplismartClient")
            .field("transport", &std::any::type_name::<T>())
            .field("sleeper", &std::any::type_name::<S>())
            .finish()
    }
}

impl SimplismartClient {
    /// Creates a client over `reqwest::blocking` with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(ClientOptions::default())
    }

    /// Creates a client over `reqwest::blocking` with the given options.
    pub fn with_options(opts: ClientOptions) -> Result<Self> {
        Ok(Self::from_parts(ReqwestTransport::new(opts)?, ThreadSleeper))
    }
}

impl<T: Transport, S: Sleeper> SimplismartClient<T, S> {
    /// Assembles a client from an explicit transport and sleeper.
    pub fn from_parts(transport: T, sleeper: S) -> Self {
        Self { transport, sleeper }
    }

    /// Sends `request`, retrying failed attempts per `policy`.
    ///
    /// Returns the parsed JSON object of the first successful attempt. When
    /// every attempt fails the error is [`SimplismartError::RetriesExhausted`]
    /// wrapping the last failure.
    pub fn submit(&self, request: &Request, policy: &RetryPolicy) -> Result<JsonMap> {
        self.submit_with_history(request, policy).result
    }

    /// Same as [`Self::submit`], also returning the attempts made.
    pub fn submit_with_history(&self, request: &Request, policy: &RetryPolicy) -> Submission {
        let max_attempts = policy.max_attempts();
        let mut attempts = Vec::with_capacity(max_attempts.min(16));
        let mut index = 0usize;

        loop {
            let started_at = SystemTime::now();
            let err = match self.attempt(request) {
                Ok(body) => {
                    attempts.push(Attempt {
                        index,
                        started_at,
                        outcome: AttemptOutcome::Success,
                    });
                    return Submission {
                        result: Ok(body),
                        attempts,
                    };
                }
                Err(err) => err,
            };

            if !should_retry(&err, policy.retry_on()) {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt = index, error = %err, "request failed, not retryable");

                attempts.push(Attempt {
                    index,
                    started_at,
                    outcome: AttemptOutcome::FatalFailure(err.to_string()),
                });
                return Submission {
                    result: Err(err),
                    attempts,
                };
            }

            attempts.push(Attempt {
                index,
                started_at,
                outcome: AttemptOutcome::TransientFailure(err.to_string()),
            });

            if index + 1 >= max_attempts {
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts = index + 1, error = %err, "retry budget exhausted");

                return Submission {
                    result: Err(SimplismartError::RetriesExhausted {
                        attempts: index + 1,
                        source: Box::new(err),
                    }),
                    attempts,
                };
            }

            let delay = policy.delay_for(index);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "attempt {}/{} failed ({}), retrying in {} ms",
                index + 1,
                max_attempts,
                err,
                delay.as_millis()
            );

            self.sleeper.sleep(delay);
            index += 1;
        }
    }

    fn attempt(&self, request: &Request) -> Result<JsonMap> {
        let response = self.transport.send(request)?;
        if !response.is_success() {
            let RawResponse { status, body } = response;
            return Err(SimplismartError::Http { status, body });
        }
        decode_object(&response.body)
    }
}

/// Sends `request` with a fresh default client.
pub fn submit(request: &Request, policy: &RetryPolicy) -> Result<JsonMap> {
    SimplismartClient::new()?.submit(request, policy)
}

fn decode_object(body: &str) -> Result<JsonMap> {
    let value = serde_json::from_str::<Value>(body).map_err(|err| {
        SimplismartError::Decode(format!("invalid response JSON: {err}; body: {body}"))
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SimplismartError::Decode(format!(
            "expected JSON object response, got {}",
            json_kind(&other)
        ))),
    }
}

fn should_retry(err: &SimplismartError, retry_on: RetryOn) -> bool {
    match retry_on {
        RetryOn::AnyFailure => err.is_transient(),
        RetryOn::TransientOnly => match err {
            SimplismartError::Http { status, .. } => should_retry_status(*status),
            SimplismartError::Transport(source) => should_retry_transport(source.as_ref()),
            _ => false,
        },
    }
}

fn should_retry_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

fn should_retry_transport(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    match err.downcast_ref::<reqwest::Error>() {
        Some(err) => err.is_timeout() || err.is_connect() || err.is_request() || err.is_body(),
        // Non-reqwest transports only report exchanges that never completed.
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        thread,
        time::Duration,
    };

    use serde_json::json;

    use super::{should_retry_status, SimplismartClient};
    use crate::{
        sleep::Sleeper,
        transport::{RawResponse, Transport},
        AttemptOutcome, Credential, Request, Result, RetryOn, RetryPolicy, SimplismartError,
    };

    enum Step {
        Fail,
        Status(u16),
        Ok(serde_json::Value),
        Body(&'static str),
    }

    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self::new(Vec::new())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, _request: &Request) -> Result<RawResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .steps
                .lock()
                .expect("steps mutex must not be poisoned")
                .pop_front()
                .unwrap_or(Step::Fail);
            match step {
                Step::Fail => Err(SimplismartError::transport(io::Error::from(
                    io::ErrorKind::ConnectionRefused,
                ))),
                Step::Status(status) => Ok(RawResponse::new(status, "upstream says no")),
                Step::Ok(body) => Ok(RawResponse::new(200, body.to_string())),
                Step::Body(body) => Ok(RawResponse::new(200, body)),
            }
        }
    }

    struct EchoTransport;

    impl Transport for EchoTransport {
        fn send(&self, request: &Request) -> Result<RawResponse> {
            let body = serde_json::to_string(request.payload())
                .map_err(SimplismartError::transport)?;
            Ok(RawResponse::new(200, body))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn delays(&self) -> Vec<Duration> {
            self.delays
                .lock()
                .expect("delays mutex must not be poisoned")
                .clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.delays
                .lock()
                .expect("delays mutex must not be poisoned")
                .push(duration);
        }
    }

    fn request() -> Request {
        Request::from_json(
            "https://inference.test/v1",
            Credential::bearer("token"),
            json!({"prompt": "hello"}),
        )
        .expect("object payload")
    }

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_secs(2)).expect("valid policy")
    }

    #[test]
    fn always_failing_transport_uses_every_attempt() {
        for n in 1..=5 {
            let transport = ScriptedTransport::failing();
            let sleeper = RecordingSleeper::default();
            let client = SimplismartClient::from_parts(&transport, &sleeper);

            let submission = client.submit_with_history(&request(), &policy(n));

            assert_eq!(transport.calls(), n);
            assert_eq!(submission.attempt_count(), n);
            assert_eq!(sleeper.delays().len(), n - 1);
            match submission.result {
                Err(SimplismartError::RetriesExhausted { attempts, source }) => {
                    assert_eq!(attempts, n);
                    assert!(matches!(*source, SimplismartError::Transport(_)));
                }
                other => panic!("expected exhausted retries, got {other:?}"),
            }
        }
    }

    #[test]
    fn succeeds_after_k_failures_without_extra_calls() {
        let transport = ScriptedTransport::new(vec![
            Step::Fail,
            Step::Status(502),
            Step::Ok(json!({"answer": 42})),
            Step::Ok(json!({"answer": "never"})),
        ]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);

        let submission = client.submit_with_history(&request(), &policy(5));

        assert_eq!(transport.calls(), 3);
        let body = submission.result.expect("third attempt succeeds");
        assert_eq!(body["answer"], 42);
        assert_eq!(submission.attempts.len(), 3);
        assert!(matches!(
            submission.attempts[0].outcome,
            AttemptOutcome::TransientFailure(_)
        ));
        assert_eq!(submission.attempts[2].outcome, AttemptOutcome::Success);
        assert_eq!(
            submission
                .attempts
                .iter()
                .map(|attempt| attempt.index)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn default_backoff_sleeps_one_two_four_seconds() {
        let transport = ScriptedTransport::failing();
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);

        let _ = client.submit(&request(), &policy(4));

        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn custom_backoff_is_consulted_per_failed_attempt() {
        let transport = ScriptedTransport::new(vec![Step::Fail, Step::Fail, Step::Ok(json!({}))]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);
        let policy = policy(3).with_backoff(|attempt| Duration::from_millis(100 + attempt as u64));

        client
            .submit(&request(), &policy)
            .expect("third attempt succeeds");

        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(101)]
        );
    }

    #[test]
    fn single_attempt_fails_immediately_without_sleeping() {
        let transport = ScriptedTransport::failing();
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);

        let err = client
            .submit(&request(), &RetryPolicy::no_retry())
            .expect_err("must fail");

        assert_eq!(transport.calls(), 1);
        assert!(sleeper.delays().is_empty());
        assert!(matches!(
            err,
            SimplismartError::RetriesExhausted { attempts: 1, .. }
        ));
    }

    #[test]
    fn client_errors_are_retried_under_default_policy() {
        let transport = ScriptedTransport::new(vec![Step::Status(400), Step::Ok(json!({"ok": true}))]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);

        let body = client
            .submit(&request(), &policy(2))
            .expect("second attempt succeeds");

        assert_eq!(body["ok"], true);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn transient_only_returns_client_errors_unwrapped() {
        let transport = ScriptedTransport::new(vec![Step::Status(401), Step::Ok(json!({}))]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);
        let policy = policy(3).with_retry_on(RetryOn::TransientOnly);

        let submission = client.submit_with_history(&request(), &policy);

        assert_eq!(transport.calls(), 1);
        assert!(sleeper.delays().is_empty());
        assert!(matches!(
            submission.attempts[0].outcome,
            AttemptOutcome::FatalFailure(_)
        ));
        assert!(matches!(
            submission.result,
            Err(SimplismartError::Http { status: 401, .. })
        ));
    }

    #[test]
    fn transient_only_still_retries_server_errors() {
        let transport = ScriptedTransport::new(vec![Step::Status(503), Step::Ok(json!({"v": 1}))]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);
        let policy = policy(3).with_retry_on(RetryOn::TransientOnly);

        client
            .submit(&request(), &policy)
            .expect("second attempt succeeds");
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn transient_only_retries_transport_failures() {
        let transport = ScriptedTransport::new(vec![Step::Fail, Step::Fail, Step::Ok(json!({}))]);
        let sleeper = RecordingSleeper::default();
        let client = SimplismartClient::from_parts(&transport, &sleeper);
        let policy = policy(3).with_retry_on(RetryOn::TransientOnly);

        let submission = client.submit_with_history(&request(), &policy);

        assert!(submission.result.is_ok());
        assert_eq!(transport.calls(), 3);
        assert_eq!(sleeper.delays().len(), 2);
        assert!(matches!(
            submission.attempts[1].outcome,
            AttemptOutcome::TransientFailure(_)
        ));
    }

    #[test]
    fn malformed_success_body_is_not_retried() {
        for body in ["not json", "[1, 2, 3]"] {
            let transport = ScriptedTransport::new(vec![Step::Body(body), Step::Ok(json!({}))]);
            let sleeper = RecordingSleeper::default();
            let client = SimplismartClient::from_parts(&transport, &sleeper);

            let err = client
                .submit(&request(), &policy(3))
                .expect_err("must fail");

            assert!(matches!(err, SimplismartError::Decode(_)));
            assert_eq!(transport.calls(), 1);
            assert!(sleeper.delays().is_empty());
        }
    }

    #[test]
    fn echo_round_trip_returns_payload() {
        let payload = json!({
            "image": "aGVsbG8=",
            "prompt": "Change the background",
            "guidance_scale": 2.5,
            "num_inference_steps": 28,
            "nested": {"list": [1, "two", null]}
        });
        let request = Request::from_json("https://echo", Credential::bearer("t"), payload.clone())
            .expect("object payload");
        let client = SimplismartClient::from_parts(EchoTransport, RecordingSleeper::default());

        let body = client
            .submit(&request, &RetryPolicy::default())
            .expect("echo succeeds");

        assert_eq!(serde_json::Value::Object(body), payload);
    }

    #[test]
    fn concurrent_submissions_resolve_independently() {
        let schedules: Vec<(usize, usize)> = vec![(0, 3), (1, 3), (2, 3), (3, 3), (5, 2)];
        let client_sleeper = Arc::new(RecordingSleeper::default());

        let handles: Vec<_> = schedules
            .into_iter()
            .enumerate()
            .map(|(id, (failures, max_attempts))| {
                let sleeper = Arc::clone(&client_sleeper);
                thread::spawn(move || {
                    let mut steps: Vec<Step> = (0..failures).map(|_| Step::Fail).collect();
                    steps.push(Step::Ok(json!({ "id": id })));
                    let transport = ScriptedTransport::new(steps);
                    let client = SimplismartClient::from_parts(&transport, sleeper);
                    let result = client.submit(&request(), &policy(max_attempts));
                    (id, failures, max_attempts, transport.calls(), result)
                })
            })
            .collect();

        for handle in handles {
            let (id, failures, max_attempts, calls, result) =
                handle.join().expect("worker must not panic");
            if failures < max_attempts {
                let body = result.expect("schedule succeeds within budget");
                assert_eq!(body["id"], id);
                assert_eq!(calls, failures + 1);
            } else {
                assert!(matches!(
                    result,
                    Err(SimplismartError::RetriesExhausted { attempts, .. }) if attempts == max_attempts
                ));
                assert_eq!(calls, max_attempts);
            }
        }
    }

    #[test]
    fn gateway_statuses_are_transient() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(should_retry_status(status));
        }
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!should_retry_status(status));
        }
    }
}
