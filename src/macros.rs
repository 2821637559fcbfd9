// Copyright 2022 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Useful macros for definiting protocol structures.

/// A macro for defining serializable and deserializable protocol enums.
///
/// `Clone`, `Debug`, `Serialize`/`Deserialize` and equality traits are automatically derived.
/// Services are free to extend the set of values they return, so every enum gets an additional
/// `Other(String)` variant that keeps any value not listed in the definition:
///
/// ```rust
/// oscloud::protocol_enum! {
///     #[doc = "Possible image statuses."]
///     enum ImageStatus {
///         Queued = "queued",
///         Active = "active",
///         Deleted = "deleted"
///     }
/// }
///
/// let status: ImageStatus = serde_json::from_str("\"active\"").unwrap();
/// assert_eq!(status, ImageStatus::Active);
/// let status: ImageStatus = serde_json::from_str("\"importing\"").unwrap();
/// assert_eq!(status, ImageStatus::Other("importing".into()));
/// assert_eq!(status.as_str(), "importing");
/// ```
#[macro_export]
macro_rules! protocol_enum {
    {$(#[$attr:meta])* enum $name:ident {
        $($(#[$iattr:meta])* $item:ident = $val:literal),+
    }} => (
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$iattr])* $item),+,
            /// A value unknown to this library.
            Other(String),
        }

        impl $name {
            /// The protocol value of this item.
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$item => $val),+,
                    $name::Other(value) => value.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> $name {
                match value {
                    $($val => $name::$item),+,
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> $name {
                match value.as_str() {
                    $($val => $name::$item),+,
                    _ => $name::Other(value),
                }
            }
        }

        impl From<$name> for String {
            /// Converts the enum to the protocol value.
            fn from(value: $name) -> String {
                match value {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            /// Displays the underlying protocol value.
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                let value = <String as ::serde::de::Deserialize>::deserialize(deserializer)?;
                Ok($name::from(value))
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                serializer.serialize_str(self.as_str())
            }
        }
    );
}

/// A macro for defining opaque string identifiers assigned by a server.
///
/// The resulting type is a serializable newtype over `String` that is compared, hashed and
/// displayed as the underlying value.
///
/// ```rust
/// oscloud::opaque_id! {
///     #[doc = "Identifier of a server."]
///     ServerId
/// }
///
/// let id = ServerId::new("5c2d9a1f");
/// assert_eq!(id.as_str(), "5c2d9a1f");
/// assert_eq!(serde_json::to_string(&id).unwrap(), "\"5c2d9a1f\"");
/// ```
#[macro_export]
macro_rules! opaque_id {
    {$(#[$attr:meta])* $name:ident} => (
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from its string representation.
            #[inline]
            pub fn new<S: Into<String>>(value: S) -> $name {
                $name(value.into())
            }

            /// The underlying string value.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> $name {
                $name(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> $name {
                $name(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                    where D: ::serde::de::Deserializer<'de> {
                <String as ::serde::de::Deserialize>::deserialize(deserializer).map($name)
            }
        }

        impl ::serde::ser::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                    where S: ::serde::ser::Serializer {
                serializer.serialize_str(&self.0)
            }
        }
    );
}

#[cfg(test)]
pub mod test {
    use std::collections::HashSet;

    use crate::{opaque_id, protocol_enum};

    protocol_enum! {
        enum TaskStatus {
            Pending = "pending",
            Success = "success",
            Failure = "failure"
        }
    }

    #[test]
    fn test_known() {
        assert_eq!("success", &String::from(TaskStatus::Success));
        assert_eq!("success", TaskStatus::Success.to_string());
        assert_eq!(
            TaskStatus::Success,
            serde_json::from_str("\"success\"").unwrap()
        );
        assert_eq!(
            "\"success\"",
            serde_json::to_string(&TaskStatus::Success).unwrap()
        );
        assert!(serde_json::from_str::<TaskStatus>("42").is_err());
        assert!(!(TaskStatus::Pending == TaskStatus::Success));
    }

    #[test]
    fn test_other() {
        let value: TaskStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(value, TaskStatus::Other("archived".into()));
        assert_eq!("archived", value.as_str());
        assert_eq!("\"archived\"", serde_json::to_string(&value).unwrap());
        assert_eq!(TaskStatus::from("pending"), TaskStatus::Pending);
        assert_eq!(String::from(value), "archived");
    }

    opaque_id! {
        WidgetId
    }

    #[test]
    fn test_opaque_id() {
        let id: WidgetId = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(id, WidgetId::new("abc-1"));
        assert_eq!(id.to_string(), "abc-1");
        assert_eq!(id.as_ref(), "abc-1");

        let mut set = HashSet::new();
        assert!(set.insert(id.clone()));
        assert!(!set.insert(WidgetId::from("abc-1")));
        assert_eq!(String::from(id), "abc-1");
    }
}
