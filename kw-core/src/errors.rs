pub use std::backtrace::Backtrace;

pub use anyhow::{
    anyhow,
    bail,
    ensure,
};
pub use paste::paste;
pub use regex::{
    Regex,
    RegexBuilder,
};
pub use thiserror::Error;

pub type EmptyResult = anyhow::Result<()>;

pub const BUILD_DIR: &str = "/.build/";
pub const RUSTC_DIR: &str = "/rustc/";
pub const CARGO_REGISTRY_DIR: &str = "/.cargo/registry/";
pub const GLIBC: &str = "glibc";

// This macro creates an enum which derives from thiserror::Error, and also creates constructor
// functions in snake case for each of the enum variants.  The (optional) visibility is applied to
// both the enum and the constructors, so that callers in other crates can match on the variants
// with `err.downcast_ref::<ErrType>()`.
#[macro_export]
macro_rules! err_impl {
    (@hidden $vis:vis $errtype:ident, $item:ident, String) => {
        paste! {
            $vis fn [<$item:snake>](in_: &str) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.into())}
            }
        }
    };

    (@hidden $vis:vis $errtype:ident, $item:ident, $($dtype:tt)::+) => {
        paste! {
            $vis fn [<$item:snake>](in_: &$($dtype)::+) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.clone())}
            }
        }
    };

    ($vis:vis $errtype:ident,
        $(#[$errinfo:meta] $item:ident($($dtype:tt)::+),)+
    ) => {
        #[derive(Debug, Error)]
        $vis enum $errtype {
            $(#[$errinfo] $item($($dtype)::+)),+
        }

        impl $errtype {
            $(err_impl! {@hidden $vis $errtype, $item, $($dtype)::+})+
        }
    };
}

// Tokio-heavy backtraces are mostly runtime frames; this keeps only the frames that point at
// our own code and collapses everything else into "<skipped N frames>" markers.  It's not cheap,
// so it should only be used on paths that are already exceptional (a watch loop giving up, etc).
pub fn filtered_backtrace(err: &anyhow::Error) -> String {
    let bt = err.backtrace().to_string();
    let Ok(re) = RegexBuilder::new(r"^\s+\d+(?s:.*?)(\s+at\s+.*:\d+)$")
        .multi_line(true)
        .build()
    else {
        return bt;
    };

    let mut skipped = 0;
    let mut out = String::new();
    for frame in re.find_iter(&bt).map(|m| m.as_str()) {
        if frame.contains(BUILD_DIR)
            || frame.contains(RUSTC_DIR)
            || frame.contains(CARGO_REGISTRY_DIR)
            || frame.contains(GLIBC)
        {
            skipped += 1;
            continue;
        }

        push_skipped(&mut out, skipped);
        out.push_str(frame);
        out.push('\n');
        skipped = 0;
    }
    push_skipped(&mut out, skipped);
    out
}

fn push_skipped(out: &mut String, skipped: usize) {
    match skipped {
        0 => (),
        1 => out.push_str("      -- <skipped 1 frame> --\n"),
        n => out.push_str(&format!("      -- <skipped {n} frames> --\n")),
    }
}

// Log an anyhow::Error at error level along with the pruned backtrace.  The caller needs
// `tracing::*` in scope.
#[macro_export]
macro_rules! kwerr {
    ($err:expr, $msg:literal) => {
        $crate::kwerr!($err, $msg,)
    };

    ($err:expr, $msg:literal, $($args:expr),* $(,)?) => {{
        let err: &anyhow::Error = &$err;
        error!(
            concat!($msg, "\n\n{}\n\nPartial Stack Trace:\n\n{}\n")
            $(, $args)*,
            err,
            $crate::errors::filtered_backtrace(err),
        );
    }};
}

pub use {
    err_impl,
    kwerr,
};
