//! Call-site descriptors captured at the raise site.
//!
//! Sites are never discovered by walking the stack. They are produced either
//! by the [`here!`](crate::here) macro, which records the module path and the
//! enclosing function, or by `#[track_caller]` constructors, which record
//! file and line only.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::panic::Location;

/// Function name recorded when only a source location is known.
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Argument list used when arguments are unknown or cannot be rendered.
pub const ARGUMENTS_PLACEHOLDER: &str = "(...)";

/// Where an issue was raised or a log record was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    package: String,
    file: String,
    line: u32,
    function: String,
}

impl CallSite {
    /// Build a site from explicit parts.
    pub fn new(
        package: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        function: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Capture the caller's file and line.
    ///
    /// Every `#[track_caller]` frame between the raise site and this call is
    /// transparent, so constructors layered on top of each other still
    /// report the application's location.
    #[track_caller]
    pub fn caller(package: &str) -> Self {
        let location = Location::caller();
        Self::new(
            package,
            location.file(),
            location.line(),
            UNKNOWN_FUNCTION,
        )
    }

    /// Originating package or module path.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Source file.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Function signature, possibly with rendered arguments.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} at {}:{}",
            self.function, self.file, self.line
        )
    }
}

/// Capture a [`CallSite`] for the enclosing function.
///
/// `here!()` records the module path, file, line, and the enclosing
/// function (qualified by its type for methods). Passing local variables
/// renders them into the argument list with their `Debug` output:
///
/// ```
/// use ers_domain::here;
///
/// fn open(path: &str) -> ers_domain::CallSite {
///     here!(path)
/// }
///
/// let site = open("test.py");
/// assert_eq!(site.function(), "open(path = \"test.py\")");
/// ```
#[macro_export]
macro_rules! here {
    () => {
        $crate::site::CallSite::new(
            ::core::module_path!(),
            ::core::file!(),
            ::core::line!(),
            $crate::site::function_signature($crate::__function_path!(), None),
        )
    };
    ($($arg:ident),+ $(,)?) => {
        $crate::site::CallSite::new(
            ::core::module_path!(),
            ::core::file!(),
            ::core::line!(),
            {
                let arguments: &[(&str, &dyn ::core::fmt::Debug)] =
                    &[$((::core::stringify!($arg), &$arg)),+];
                $crate::site::function_signature($crate::__function_path!(), Some(arguments))
            },
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn __ers_site() {}
        ::core::any::type_name_of_val(&__ers_site)
    }};
}

/// Render a function signature from a raw type path and optional arguments.
///
/// A failing `Debug` implementation collapses the whole argument list to
/// [`ARGUMENTS_PLACEHOLDER`]; capture never fails.
#[doc(hidden)]
pub fn function_signature(raw_path: &str, arguments: Option<&[(&str, &dyn fmt::Debug)]>) -> String {
    let name = qualified_function_name(raw_path);
    let Some(arguments) = arguments else {
        return format!("{name}{ARGUMENTS_PLACEHOLDER}");
    };

    let mut rendered = String::new();
    for (index, (label, value)) in arguments.iter().enumerate() {
        let separator = if index == 0 { "" } else { ", " };
        if write!(rendered, "{separator}{label} = {value:?}").is_err() {
            return format!("{name}{ARGUMENTS_PLACEHOLDER}");
        }
    }
    format!("{name}({rendered})")
}

/// Reduce a `type_name` path of a nested marker fn to `Type::method` or
/// `function`.
fn qualified_function_name(raw_path: &str) -> String {
    let mut segments = split_path(raw_path);
    segments.pop();
    while segments.last().is_some_and(|segment| *segment == "{{closure}}") {
        segments.pop();
    }

    let Some(function) = segments.pop() else {
        return UNKNOWN_FUNCTION.to_owned();
    };
    match segments.last().and_then(|segment| owning_type(segment)) {
        Some(owner) => format!("{owner}::{function}"),
        None => function.to_owned(),
    }
}

/// Split on `::` outside of angle brackets.
fn split_path(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = path.as_bytes();
    let mut index = 0usize;
    while index < bytes.len() {
        match bytes.get(index) {
            Some(b'<') => depth += 1,
            Some(b'>') => depth = depth.saturating_sub(1),
            Some(b':') if depth == 0 && bytes.get(index + 1) == Some(&b':') => {
                if let Some(segment) = path.get(start..index) {
                    segments.push(segment);
                }
                index += 2;
                start = index;
                continue;
            },
            _ => {},
        }
        index += 1;
    }
    if let Some(segment) = path.get(start..) {
        segments.push(segment);
    }
    segments
}

/// The type name a method segment belongs to, if the segment names a type.
fn owning_type(segment: &str) -> Option<&str> {
    if let Some(inner) = segment.strip_prefix('<') {
        let inner = inner.strip_suffix('>').unwrap_or(inner);
        let self_type = inner.split(" as ").next().unwrap_or(inner);
        let self_type = self_type.split('<').next().unwrap_or(self_type);
        return self_type.rsplit("::").next();
    }
    segment
        .chars()
        .next()
        .filter(char::is_ascii_uppercase)
        .map(|_| segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Opener;

    impl Opener {
        fn site(&self) -> CallSite {
            here!()
        }
    }

    struct Loud;

    impl fmt::Debug for Loud {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn here_captures_module_file_and_function() {
        let site = here!();
        assert_eq!(site.package(), module_path!());
        assert_eq!(site.file(), file!());
        assert_eq!(
            site.function(),
            "here_captures_module_file_and_function(...)"
        );
    }

    #[test]
    fn methods_are_qualified_by_type() {
        let site = Opener.site();
        assert_eq!(site.function(), "Opener::site(...)");
    }

    #[test]
    fn closures_report_the_enclosing_function() {
        let capture = || here!();
        assert_eq!(
            capture().function(),
            "closures_report_the_enclosing_function(...)"
        );
    }

    #[test]
    fn arguments_are_rendered_with_debug() {
        let filename = "test.py";
        let error = 13;
        let site = here!(filename, error);
        assert_eq!(
            site.function(),
            "arguments_are_rendered_with_debug(filename = \"test.py\", error = 13)"
        );
    }

    #[test]
    fn failing_argument_rendering_uses_placeholder() {
        let loud = Loud;
        let site = here!(loud);
        assert_eq!(
            site.function(),
            "failing_argument_rendering_uses_placeholder(...)"
        );
    }

    #[test]
    fn caller_records_this_file() {
        let site = CallSite::caller("ers");
        assert_eq!(site.file(), file!());
        assert_eq!(site.function(), UNKNOWN_FUNCTION);
        assert_eq!(site.package(), "ers");
    }

    #[test]
    fn trait_impl_paths_use_self_type() {
        assert_eq!(
            qualified_function_name("app::<app::Reader as std::io::Read>::read::__ers_site"),
            "Reader::read"
        );
        assert_eq!(qualified_function_name("__ers_site"), UNKNOWN_FUNCTION);
    }
}
