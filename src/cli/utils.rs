//! Shared CLI utilities.

use std::ffi::OsString;

/// Long flags that may also be spelled with a single dash (`-def=path`).
const LEGACY_LONG_FLAGS: &[&str] = &["def", "env", "section", "engine"];

/// Rewrite `-def=x` / `-env x` style flags to their `--` form.
///
/// Only arguments before the subcommand are touched, so a negative step
/// count such as `migrate -2` passes through unchanged.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let mut normalized: Vec<OsString> = iter.next().into_iter().collect();
    let mut expect_value = false;

    while let Some(arg) = iter.next() {
        if expect_value {
            expect_value = false;
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            normalized.extend(iter);
            break;
        };

        if let Some(rest) = text.strip_prefix("--") {
            expect_value = takes_separate_value(rest);
            normalized.push(arg);
        } else if let Some(rest) = text.strip_prefix('-') {
            if takes_value(rest) {
                expect_value = takes_separate_value(rest);
                normalized.push(OsString::from(format!("-{}", text)));
            } else {
                normalized.push(arg);
            }
        } else {
            // first positional is the subcommand
            normalized.push(arg);
            normalized.extend(iter);
            break;
        }
    }

    normalized
}

fn flag_name(flag: &str) -> &str {
    flag.split('=').next().unwrap_or(flag)
}

fn takes_value(flag: &str) -> bool {
    LEGACY_LONG_FLAGS.contains(&flag_name(flag))
}

fn takes_separate_value(flag: &str) -> bool {
    takes_value(flag) && !flag.contains('=')
}
