//! Demonstration scenarios
//!
//! Each scenario is a script run as the event loop's first task. Scripts
//! log through a [`Console`] and use a [`TimerHost`] for `setTimeout`-style
//! latency, so the resulting trace is the same on every run.

use crate::timers::TimerHost;
use async_runtime::{spawn_async, Agent, AsyncFunction, Function, Promise, PromiseState};
use clap::ValueEnum;
use core_types::{ErrorKind, JsError, Value};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

const USER_URL: &str = "/article/promise-chaining/user.json";
const TODO_URL: &str = "https://jsonplaceholder.typicode.com/todos/1";
const GITHUB_USERS_URL: &str = "https://api.github.com/users/";

/// A demonstration the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Executors, settle-once, then and finally
    Basics,
    /// Value propagation and returned promises
    Chaining,
    /// Implicit try/catch, rethrowing and unhandled rejections
    Errors,
    /// Handler ordering relative to synchronous code
    Microtasks,
    /// Async functions and await
    AsyncAwait,
    /// Sequential awaits versus `all`
    Aggregation,
}

impl Scenario {
    /// Every scenario, in the order `--all` runs them.
    pub const ALL: [Scenario; 6] = [
        Scenario::Basics,
        Scenario::Chaining,
        Scenario::Errors,
        Scenario::Microtasks,
        Scenario::AsyncAwait,
        Scenario::Aggregation,
    ];

    /// Command-line name of the scenario.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::Basics => "basics",
            Scenario::Chaining => "chaining",
            Scenario::Errors => "errors",
            Scenario::Microtasks => "microtasks",
            Scenario::AsyncAwait => "async-await",
            Scenario::Aggregation => "aggregation",
        }
    }

    /// One-line summary shown by `--list`.
    pub fn description(self) -> &'static str {
        match self {
            Scenario::Basics => "executors, settle-once, then and finally",
            Scenario::Chaining => "value propagation through then chains and returned promises",
            Scenario::Errors => "implicit try/catch, rethrowing and unhandled rejections",
            Scenario::Microtasks => "handlers always run after the current script",
            Scenario::AsyncAwait => "async functions suspend at await",
            Scenario::Aggregation => "sequential awaits versus all",
        }
    }

    /// Runs the scenario's script. Further work happens in reactions and
    /// timers the script sets up.
    pub fn script(self, cx: &ScenarioContext) -> Result<(), JsError> {
        match self {
            Scenario::Basics => basics(cx),
            Scenario::Chaining => chaining(cx),
            Scenario::Errors => errors(cx),
            Scenario::Microtasks => microtasks(cx),
            Scenario::AsyncAwait => async_await(cx),
            Scenario::Aggregation => aggregation(cx),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered record of console output.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Console {
    /// Creates an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line.
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "promise_cli::console", "{}", line);
        self.lines.borrow_mut().push(line);
    }

    /// Lines logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

/// Everything a scenario script can reach: the agent, the timers and the console.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    agent: Agent,
    timers: TimerHost,
    console: Console,
}

impl ScenarioContext {
    /// Bundles the handles a script needs.
    pub fn new(agent: Agent, timers: TimerHost, console: Console) -> Self {
        Self {
            agent,
            timers,
            console,
        }
    }

    /// The agent the script's promises belong to.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The timer host.
    pub fn timers(&self) -> &TimerHost {
        &self.timers
    }

    /// Logs a line to the console.
    pub fn log(&self, line: impl Into<String>) {
        self.console.log(line);
    }

    /// Handler that logs `prefix` followed by its argument and returns undefined.
    ///
    /// Error objects are logged by message only.
    pub fn logger(&self, prefix: &str) -> Function {
        let console = self.console.clone();
        let prefix = prefix.to_string();
        Function::unary(move |value| {
            console.log(format!("{}{}", prefix, message(&value)));
            Ok(Value::Undefined)
        })
    }

    /// A promise that fulfills with `value` after `ms` milliseconds.
    pub fn delay(&self, ms: u64, value: impl Into<Value>) -> Promise {
        let value = value.into();
        let timers = self.timers.clone();
        Promise::new(&self.agent, move |resolver| {
            timers.set_timeout(ms, move || {
                resolver.resolve(value);
                Ok(Value::Undefined)
            });
            Ok(())
        })
    }

    /// A promise that rejects with `error` after `ms` milliseconds.
    pub fn fail_after(&self, ms: u64, error: JsError) -> Promise {
        let timers = self.timers.clone();
        Promise::new(&self.agent, move |resolver| {
            timers.set_timeout(ms, move || {
                resolver.reject(error.into_value());
                Ok(Value::Undefined)
            });
            Ok(())
        })
    }

    /// Simulated network request resolving with a JSON body.
    pub fn fetch(&self, url: &str) -> Promise {
        if !(url.starts_with('/') || url.starts_with("https://")) {
            return self.fail_after(
                10,
                JsError::type_error("Only absolute URLs are supported"),
            );
        }

        let body = if url == USER_URL {
            serde_json::json!({ "name": "iliakan", "isAdmin": true })
        } else if url == TODO_URL {
            serde_json::json!({
                "userId": 1,
                "id": 1,
                "title": "delectus aut autem",
                "completed": false
            })
        } else if url == format!("{}iliakan", GITHUB_USERS_URL) {
            serde_json::json!({
                "login": "iliakan",
                "name": "Ilya Kantor",
                "avatar_url": "https://avatars.githubusercontent.com/u/349336?v=4"
            })
        } else {
            return self.fail_after(100, JsError::error(format!("404 Not Found: {}", url)));
        };
        self.delay(100, body.to_string())
    }

    /// `fetch(url).then(response => response.json())`.
    pub fn load_json(&self, url: &str) -> Promise {
        self.fetch(url).then(Some(Function::unary(parse_json)), None)
    }
}

/// The message of an error payload, or the payload itself.
fn message(value: &Value) -> String {
    match value {
        Value::Error(error) => error.message.clone(),
        other => other.to_string(),
    }
}

fn describe(promise: &Promise) -> String {
    match promise.state() {
        PromiseState::Pending => "pending".to_string(),
        PromiseState::Fulfilled(value) => format!("fulfilled with {}", value),
        PromiseState::Rejected(reason) => format!("rejected with {}", reason),
    }
}

fn number(value: &Value) -> Result<i32, JsError> {
    match value {
        Value::Smi(n) => Ok(*n),
        other => Err(JsError::type_error(format!("{} is not a number", other))),
    }
}

fn parse_json(body: Value) -> Result<Value, JsError> {
    let text = body
        .as_str()
        .ok_or_else(|| JsError::type_error(format!("{} is not a response body", body)))?;
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| JsError::new(ErrorKind::Error, format!("Unexpected token in JSON: {}", e)))?;
    Ok(Value::from(parsed.to_string()))
}

fn json_field(body: &Value, field: &str) -> Result<String, JsError> {
    let parsed: serde_json::Value = serde_json::from_str(body.as_str().unwrap_or_default())
        .map_err(|e| JsError::new(ErrorKind::Error, format!("Unexpected token in JSON: {}", e)))?;
    parsed
        .get(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            JsError::type_error(format!(
                "Cannot read properties of undefined (reading '{}')",
                field
            ))
        })
}

fn basics(cx: &ScenarioContext) -> Result<(), JsError> {
    let promise = cx.delay(1000, 2);
    cx.log(format!("promise: {}", describe(&promise)));
    let (c, p) = (cx.clone(), promise.clone());
    let _ = promise.then(
        Some(Function::unary(move |_| {
            c.log(format!("promise: {}", describe(&p)));
            Ok(Value::Undefined)
        })),
        None,
    );

    let promise3 = Promise::new(cx.agent(), |resolver| {
        resolver.resolve("done");
        resolver.reject("error");
        Ok(())
    });
    cx.log(format!("promise3: {}", describe(&promise3)));

    let promise4 = Promise::new(cx.agent(), |resolver| {
        resolver.resolve(123);
        Ok(())
    });
    cx.log(format!("promise4: {}", describe(&promise4)));

    let _ = cx.delay(1000, 1).then(
        Some(cx.logger("resolved promise ")),
        Some(cx.logger("this is error ")),
    );

    let c = cx.clone();
    let _ = cx
        .delay(200, "value")
        .finally(Function::new(move |_| {
            c.log("Promise ready");
            Ok(Value::Undefined)
        }))
        .then(Some(cx.logger("")), None);

    let c = cx.clone();
    let _ = cx
        .fail_after(1000, JsError::error("error here"))
        .finally(Function::new(move |_| {
            c.log("promise ready");
            Ok(Value::Undefined)
        }))
        .catch(cx.logger(""));

    Ok(())
}

fn chaining(cx: &ScenarioContext) -> Result<(), JsError> {
    let doubling = |cx: &ScenarioContext| {
        let c = cx.clone();
        Function::unary(move |data| {
            c.log(format!("doubling: {}", data));
            Ok(Value::Smi(number(&data)? * 2))
        })
    };
    let _ = cx
        .delay(1000, 2)
        .then(Some(doubling(cx)), None)
        .then(Some(doubling(cx)), None)
        .then(Some(doubling(cx)), None);

    let (c1, c2, c3) = (cx.clone(), cx.clone(), cx.clone());
    let _ = cx
        .delay(1000, 1)
        .then(
            Some(Function::unary(move |data| {
                c1.log(format!("returning promises: {}", data));
                let doubled = number(&data)? * 2;
                Ok(Promise::new(c1.agent(), move |resolver| {
                    resolver.resolve(doubled);
                    Ok(())
                })
                .into())
            })),
            None,
        )
        .then(
            Some(Function::unary(move |data| {
                c2.log(format!("returning promises: {}", data));
                Ok(c2.delay(1000, number(&data)? * 2).into())
            })),
            None,
        )
        .then(
            Some(Function::unary(move |data| {
                c3.log(format!("returning promises: {}", data));
                Ok(Value::Undefined)
            })),
            None,
        );

    let (load_user, show) = (cx.clone(), cx.clone());
    let _ = cx
        .load_json(USER_URL)
        .then(
            Some(Function::unary(move |user| {
                let name = json_field(&user, "name")?;
                Ok(load_user
                    .load_json(&format!("{}{}", GITHUB_USERS_URL, name))
                    .into())
            })),
            None,
        )
        .then(
            Some(Function::unary(move |github_user| {
                show.log(format!("showing avatar {}", json_field(&github_user, "avatar_url")?));
                Ok(show.delay(3000, github_user).into())
            })),
            None,
        )
        .then(
            Some(Function::unary({
                let c = cx.clone();
                move |github_user| {
                    c.log(format!("Finished showing {}", json_field(&github_user, "name")?));
                    Ok(Value::Undefined)
                }
            })),
            None,
        );

    Ok(())
}

fn errors(cx: &ScenarioContext) -> Result<(), JsError> {
    for url in ["abc", TODO_URL] {
        let c = cx.clone();
        let _ = cx
            .load_json(url)
            .then(
                Some(Function::unary(move |json| {
                    c.log(format!("todo: {}", json));
                    Ok(Value::Undefined)
                })),
                None,
            )
            .catch(cx.logger("error here "));
    }

    let whoops = || JsError::error("whoops error");

    let _ = Promise::new(cx.agent(), |_| Err(whoops())).catch(cx.logger(""));

    let _ = Promise::new(cx.agent(), |resolver| {
        resolver.reject(whoops());
        Ok(())
    })
    .catch(cx.logger("reject "));

    let _ = Promise::resolve(cx.agent(), "ok")
        .then(
            Some(Function::unary(|_| Err(JsError::error("Whoops!")))),
            None,
        )
        .catch(cx.logger("handler failure: "));

    let c = cx.clone();
    let _ = Promise::new(cx.agent(), |_| Err(whoops()))
        .catch(cx.logger("error handled "))
        .then(
            Some(Function::unary(move |_| {
                c.log("successful handler runs");
                Ok(Value::Undefined)
            })),
            None,
        );

    let _ = Promise::new(cx.agent(), |_| Err(whoops()))
        .catch(Function::unary(|err| {
            if matches!(&err, Value::Error(error) if error.kind == ErrorKind::RangeError) {
                return Ok(Value::Undefined);
            }
            Err(JsError::from_value(err))
        }))
        .then(Some(cx.logger("handle ")), None)
        .catch(Function::unary({
            let c = cx.clone();
            move |err| {
                c.log(format!("rethrown: {}", err));
                Ok(Value::Undefined)
            }
        }));

    // no catch at the end of this chain
    let _ = Promise::new(cx.agent(), |_| {
        Err(JsError::new(
            ErrorKind::ReferenceError,
            "noSuchFunction is not defined",
        ))
    })
    .then(Some(Function::unary(|_| Ok(Value::Undefined))), None);

    Ok(())
}

fn microtasks(cx: &ScenarioContext) -> Result<(), JsError> {
    let promise = Promise::resolve(cx.agent(), Value::Undefined);
    let c = cx.clone();
    let _ = promise.then(
        Some(Function::unary(move |_| {
            c.log("promise done!");
            Ok(Value::Undefined)
        })),
        None,
    );
    cx.log("code finished");

    let (c1, c2) = (cx.clone(), cx.clone());
    let _ = Promise::resolve(cx.agent(), Value::Undefined)
        .then(
            Some(Function::unary(move |_| {
                c1.log("chained: promise done!");
                Ok(Value::Undefined)
            })),
            None,
        )
        .then(
            Some(Function::unary(move |_| {
                c2.log("chained: code finished");
                Ok(Value::Undefined)
            })),
            None,
        );

    let promise2 = Promise::reject(cx.agent(), JsError::error("Promise Failed1!"));
    let _ = promise2.catch(cx.logger("caught: "));

    let promise3 = Promise::reject(cx.agent(), "error");
    cx.log(format!("promise3: {}", describe(&promise3)));

    // handled only after the rejection has been reported
    let late = cx.logger("caught late: ");
    cx.timers().set_timeout(0, move || {
        let _ = promise3.catch(late);
        Ok(Value::Undefined)
    });

    Ok(())
}

fn async_await(cx: &ScenarioContext) -> Result<(), JsError> {
    let f = AsyncFunction::new(|_cx, _args| async { Ok(Value::Smi(1)) });
    let _ = f.call(cx.agent(), Vec::new()).then(Some(cx.logger("f: ")), None);

    let f2 = AsyncFunction::new(|cx, _args| async move {
        Ok(Value::from(Promise::resolve(cx.agent(), 1)))
    });
    let _ = f2.call(cx.agent(), Vec::new()).then(Some(cx.logger("f2: ")), None);

    let c = cx.clone();
    let _ = spawn_async(cx.agent(), move |acx| async move {
        let promise = c.delay(1000, "done!");
        let result = acx.await_promise(&promise).await?;
        c.log(message(&result));
        Ok(Value::Undefined)
    });

    let c = cx.clone();
    let wait = AsyncFunction::new(move |acx, _args| {
        let c = c.clone();
        async move {
            acx.await_promise(&c.delay(1000, Value::Undefined)).await?;
            Ok(Value::Smi(10))
        }
    });
    cx.log(format!("wait(): {}", describe(&wait.call(cx.agent(), Vec::new()))));
    let _ = wait
        .call(cx.agent(), Vec::new())
        .then(Some(cx.logger("wait result: ")), None);

    let c = cx.clone();
    let show_avatar = spawn_async(cx.agent(), move |acx| async move {
        let response = acx.await_promise(&c.fetch(USER_URL)).await?;
        let name = json_field(&response, "name")?;

        let github_response = acx
            .await_promise(&c.fetch(&format!("{}{}", GITHUB_USERS_URL, name)))
            .await?;
        c.log(format!(
            "showing avatar {}",
            json_field(&github_response, "avatar_url")?
        ));

        acx.await_promise(&c.delay(3000, Value::Undefined)).await?;
        Ok(github_response)
    });
    let c = cx.clone();
    let _ = show_avatar.then(
        Some(Function::unary(move |github_user| {
            c.log(format!("Finished showing {}", json_field(&github_user, "name")?));
            Ok(Value::Undefined)
        })),
        None,
    );

    Ok(())
}

fn aggregation(cx: &ScenarioContext) -> Result<(), JsError> {
    const USER_IDS: [i32; 3] = [1, 2, 3];

    let fetch_user_info = |cx: &ScenarioContext, id: i32| {
        let user = serde_json::json!({
            "id": id,
            "mail": format!("user{}@gmail.com", id),
            "name": format!("user{}", id),
        });
        cx.delay(1000, user.to_string())
    };

    let c = cx.clone();
    let get_all_users = AsyncFunction::new(move |acx, _args| {
        let c = c.clone();
        async move {
            let started = c.timers().now_ms();
            let mut users = Vec::new();
            for id in USER_IDS {
                let user = acx.await_promise(&fetch_user_info(&c, id)).await?;
                c.log(format!("fetched {}", json_field(&user, "name")?));
                users.push(user);
            }
            c.log(format!(
                "sequential: {} users in {}ms",
                users.len(),
                c.timers().now_ms() - started
            ));
            Ok(Value::from(users))
        }
    });

    let c = cx.clone();
    let get_all_users_improved = AsyncFunction::new(move |acx, _args| {
        let c = c.clone();
        async move {
            let started = c.timers().now_ms();
            let promises: Vec<Value> = USER_IDS
                .iter()
                .map(|&id| {
                    let c = c.clone();
                    let agent = c.agent().clone();
                    Value::from(spawn_async(&agent, move |_| async move {
                        Ok(Value::from(fetch_user_info(&c, id)))
                    }))
                })
                .collect();

            let data = acx
                .await_promise(&Promise::all(acx.agent(), promises))
                .await?;
            let names = match &data {
                Value::Array(users) => users
                    .iter()
                    .map(|user| json_field(user, "name"))
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            c.log(format!("parallel: {}", names.join(", ")));
            c.log(format!(
                "parallel: {} users in {}ms",
                names.len(),
                c.timers().now_ms() - started
            ));
            Ok(data)
        }
    });

    let _ = spawn_async(cx.agent(), move |acx| async move {
        let agent = acx.agent().clone();
        acx.await_promise(&get_all_users.call(&agent, Vec::new()))
            .await?;
        acx.await_promise(&get_all_users_improved.call(&agent, Vec::new()))
            .await?;
        Ok(Value::Undefined)
    });

    Ok(())
}
