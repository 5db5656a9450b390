//! Declared issue kinds.
//!
//! A kind fixes a message template and a parameter set; the constructor call
//! supplies the values, the cause, and the call site.

/// Declare an issue kind with typed fields and a message template.
///
/// The template uses positional `{}` placeholders followed by the field
/// names that fill them. Every field is also stored as a textual parameter.
///
/// ```
/// use ers_domain::{IssueDefaults, declare_issue};
///
/// declare_issue! {
///     /// A link to a readout unit went down.
///     pub LinkDown("readout::LinkDown") {
///         /// Link number.
///         link: u32,
///     } => "Link {} is down", link;
/// }
///
/// let issue = LinkDown::new(&IssueDefaults::default(), 4u32, None);
/// assert_eq!(issue.issue().message(), "Link 4 is down");
/// assert_eq!(issue.issue().parameter("link"), Some("4"));
/// assert_eq!(*issue.link(), 4);
/// ```
#[macro_export]
macro_rules! declare_issue {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident($kind:literal) {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty
            ),* $(,)?
        } => $template:literal $(, $arg:ident)* $(,)?;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        $vis struct $name {
            issue: $crate::Issue,
            $(
                $(#[$field_meta])*
                $field: $ty,
            )*
        }

        impl $name {
            /// Kind name recorded on the issue.
            pub const KIND: &'static str = $kind;

            /// Raise at the caller's location.
            #[track_caller]
            pub fn new(
                defaults: &$crate::IssueDefaults,
                $($field: impl ::core::convert::Into<$ty>,)*
                cause: ::core::option::Option<$crate::Issue>,
            ) -> Self {
                Self::at(
                    $crate::CallSite::caller(::core::module_path!()),
                    defaults,
                    $($field,)*
                    cause,
                )
            }

            /// Raise at an explicit call site, usually from `here!()`.
            pub fn at(
                site: $crate::CallSite,
                defaults: &$crate::IssueDefaults,
                $($field: impl ::core::convert::Into<$ty>,)*
                cause: ::core::option::Option<$crate::Issue>,
            ) -> Self {
                $(let $field: $ty = ::core::convert::Into::into($field);)*
                let message = ::std::fmt::format(::core::format_args!($template $(, $arg)*));
                let builder = $crate::IssueBuilder::new(Self::KIND, message).site(site);
                $(let builder = builder.parameter(::core::stringify!($field), &$field);)*
                let builder = match cause {
                    ::core::option::Option::Some(cause) => builder.cause(cause),
                    ::core::option::Option::None => builder,
                };
                Self {
                    issue: builder.build(defaults),
                    $($field,)*
                }
            }

            /// The underlying issue.
            #[must_use]
            pub const fn issue(&self) -> &$crate::Issue {
                &self.issue
            }

            /// Give up the typed view.
            #[must_use]
            pub fn into_issue(self) -> $crate::Issue {
                self.issue
            }

            $(
                $(#[$field_meta])*
                #[must_use]
                pub const fn $field(&self) -> &$ty {
                    &self.$field
                }
            )*
        }

        impl ::core::convert::From<$name> for $crate::Issue {
            fn from(kind: $name) -> Self {
                kind.issue
            }
        }

        impl ::core::convert::AsRef<$crate::Issue> for $name {
            fn as_ref(&self) -> &$crate::Issue {
                &self.issue
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, formatter: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.issue, formatter)
            }
        }

        impl ::std::error::Error for $name {
            fn source(&self) -> ::core::option::Option<&(dyn ::std::error::Error + 'static)> {
                ::std::error::Error::source(&self.issue)
            }
        }

        impl $crate::Reportable for $name {
            fn kind(&self) -> &str {
                $crate::Reportable::kind(&self.issue)
            }

            fn message(&self) -> &str {
                $crate::Reportable::message(&self.issue)
            }

            fn severity(&self) -> $crate::Severity {
                $crate::Reportable::severity(&self.issue)
            }

            fn time(&self) -> $crate::__private::DateTime<$crate::__private::Utc> {
                $crate::Reportable::time(&self.issue)
            }

            fn parameters(&self) -> &$crate::Parameters {
                $crate::Reportable::parameters(&self.issue)
            }

            fn qualifiers(&self) -> &[::std::string::String] {
                $crate::Reportable::qualifiers(&self.issue)
            }

            fn site(&self) -> &$crate::CallSite {
                $crate::Reportable::site(&self.issue)
            }

            fn process(&self) -> &$crate::ProcessContext {
                $crate::Reportable::process(&self.issue)
            }

            fn cause(&self) -> ::core::option::Option<&dyn $crate::Reportable> {
                $crate::Reportable::cause(&self.issue)
            }
        }
    };
}

declare_issue! {
    /// Access to a resource was refused.
    pub PermissionDenied("ers::PermissionDenied") {} => "Permission denied";
}

declare_issue! {
    /// A file could not be opened.
    pub CantOpenFile("ers::CantOpenFile") {
        /// Path that failed to open.
        filename: String,
        /// Operating-system error number.
        error: i32,
    } => "Can not open \"{}\" file, error = {}", filename, error;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Issue, IssueDefaults, Reportable, Severity, here};

    fn open(defaults: &IssueDefaults) -> Result<(), PermissionDenied> {
        Err(PermissionDenied::new(defaults, None))
    }

    #[test]
    fn permission_denied_has_fixed_message_and_no_parameters() {
        let denied = PermissionDenied::new(&IssueDefaults::default(), None);

        assert_eq!(denied.issue().message(), "Permission denied");
        assert!(denied.issue().parameters().is_empty());
        assert_eq!(denied.issue().kind(), PermissionDenied::KIND);
        assert_eq!(denied.issue().severity(), Severity::Error);
        assert_eq!(denied.issue().context().file_name(), file!());
    }

    #[test]
    fn cant_open_file_wraps_its_cause() -> Result<(), Box<dyn std::error::Error>> {
        let defaults = IssueDefaults::default();
        let Err(denied) = open(&defaults) else {
            return Err("open should fail".into());
        };

        let outer = CantOpenFile::new(&defaults, "test.py", 13, Some(denied.into()));

        assert_eq!(outer.to_string(), "Can not open \"test.py\" file, error = 13");
        assert_eq!(outer.filename(), "test.py");
        assert_eq!(*outer.error(), 13);
        assert_eq!(outer.issue().parameter("filename"), Some("test.py"));
        assert_eq!(outer.issue().parameter("error"), Some("13"));
        assert_eq!(
            outer.issue().cause().map(Issue::message),
            Some("Permission denied")
        );
        Ok(())
    }

    #[test]
    fn kinds_record_declaring_module_as_package() {
        let denied = PermissionDenied::new(&IssueDefaults::default(), None);
        assert_eq!(denied.issue().context().package_name(), module_path!().trim_end_matches("::tests"));
    }

    #[test]
    fn explicit_site_overrides_location() {
        let filename = "data.bin";
        let opened = CantOpenFile::at(here!(filename), &IssueDefaults::default(), filename, 2, None);

        assert_eq!(
            Reportable::site(&opened).function(),
            "explicit_site_overrides_location(filename = \"data.bin\")"
        );
        assert_eq!(Reportable::qualifiers(&opened).first().map(String::as_str), Some(module_path!()));
    }
}
