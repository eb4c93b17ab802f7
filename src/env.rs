use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy)]
struct Env {
    step_limit: Option<usize>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        step_limit: var_parse("M6800_STEP_LIMIT"),
    };
    set_env(value);
}

/// Step ceiling requested through the environment, if any.
pub fn step_limit() -> Option<usize> {
    with_env(|env| env.step_limit)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

/// Unset or unparseable values are ignored.
fn var_parse(name: impl AsRef<OsStr>) -> Option<usize> {
    std::env::var(name.as_ref())
        .ok()
        .and_then(|v| v.trim().parse().ok())
}
