//! Declaration macros for message schemas.

/// Declare a message struct together with its [`Message`](crate::Message)
/// and [`FieldValue`](crate::FieldValue) impls.
///
/// Each field is `name: Type = tag`, optionally followed by
/// `=> "wire_name"` when the wire name is a Rust keyword.  A field declared
/// `= oneof` must have type `Option<E>` where `E` was declared with
/// [`one_of!`](crate::one_of!).
///
/// ```
/// use simbridge_types::{message, one_of, TypeDescriptor};
///
/// message! {
///     pub struct Point [TypeDescriptor::NESTED] {
///         pub x: f64 = 1,
///         pub y: f64 = 2,
///     }
/// }
///
/// one_of! {
///     pub enum Shape {
///         Line(Point) = 1 => "line",
///     }
/// }
///
/// message! {
///     pub struct Boundary [TypeDescriptor::cyber("demo.Boundary")] {
///         pub shape: Option<Shape> = oneof,
///         pub kind: u32 = 2 => "type",
///     }
/// }
/// ```
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident [$descriptor:expr] {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty = $tag:tt $(=> $wire:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Message for $name {
            const DESCRIPTOR: $crate::TypeDescriptor = $descriptor;

            #[allow(unused_variables)]
            fn encode(&self, out: &mut $crate::Record) {
                $(
                    $crate::__message_write!(
                        $tag,
                        self.$field,
                        $crate::__wire_name!($field $(, $wire)?),
                        out
                    );
                )*
            }

            #[allow(unused_variables)]
            fn decode(record: &$crate::Record) -> ::std::result::Result<Self, $crate::DecodeError> {
                ::std::result::Result::Ok(Self {
                    $(
                        $field: $crate::__message_read!(
                            $tag,
                            $ty,
                            record,
                            $crate::__wire_name!($field $(, $wire)?)
                        ),
                    )*
                })
            }
        }

        impl $crate::FieldValue for $name {
            fn to_value(&self, dialect: $crate::Dialect) -> ::std::option::Option<$crate::Value> {
                ::std::option::Option::Some($crate::Value::Record(
                    $crate::Message::to_record(self, dialect),
                ))
            }

            fn from_value(value: &$crate::Value) -> ::std::result::Result<Self, $crate::DecodeError> {
                $crate::message::decode_nested(value)
            }
        }
    };
}

/// Declare a tagged union for a `oneof` field.
///
/// Variants are `Name(Type) = tag => "member_name"`.  Only the active
/// member is encoded, under its member name.
#[macro_export]
macro_rules! one_of {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident ( $ty:ty ) = $tag:literal => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant($ty),
            )+
        }

        impl $crate::OneOf for $name {
            fn write_member(&self, out: &mut $crate::Record) {
                match self {
                    $(
                        Self::$variant(member) => $crate::FieldValue::write(member, $wire, $tag, out),
                    )+
                }
            }

            fn read_member(
                record: &$crate::Record,
            ) -> ::std::result::Result<::std::option::Option<Self>, $crate::DecodeError> {
                $(
                    if record.get($wire, $tag).is_some() {
                        return <$ty as $crate::FieldValue>::read(record, $wire, $tag)
                            .map(|member| ::std::option::Option::Some(Self::$variant(member)));
                    }
                )+
                ::std::result::Result::Ok(::std::option::Option::None)
            }
        }
    };
}

/// Declare a protobuf-style enum: `Variant = number => "NAME"`.
///
/// The first variant is the default.  JSON carries the number, text format
/// carries the name; decoding accepts either.
#[macro_export]
macro_rules! proto_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            pub const fn value(self) -> i32 {
                self as i32
            }

            pub fn from_i32(value: i32) -> ::std::option::Option<Self> {
                match value {
                    $( $value => ::std::option::Option::Some(Self::$variant), )+
                    _ => ::std::option::Option::None,
                }
            }

            pub fn as_str_name(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            pub fn from_str_name(name: &str) -> ::std::option::Option<Self> {
                match name {
                    $( $wire => ::std::option::Option::Some(Self::$variant), )+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                $crate::__first!($(Self::$variant),+)
            }
        }

        impl $crate::FieldValue for $name {
            fn to_value(&self, _dialect: $crate::Dialect) -> ::std::option::Option<$crate::Value> {
                ::std::option::Option::Some($crate::Value::Enum {
                    value: self.value(),
                    name: self.as_str_name(),
                })
            }

            fn from_value(value: &$crate::Value) -> ::std::result::Result<Self, $crate::DecodeError> {
                if let $crate::Value::String(name) = value {
                    return Self::from_str_name(name).ok_or_else(|| {
                        $crate::DecodeError::new(format!(
                            "unknown {} name '{name}'",
                            stringify!($name)
                        ))
                    });
                }
                let number = <i32 as $crate::FieldValue>::from_value(value)?;
                Self::from_i32(number).ok_or_else(|| {
                    $crate::DecodeError::new(format!(
                        "unknown {} value {number}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $wire:literal) => {
        $wire
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __message_write {
    (oneof, $value:expr, $name:expr, $out:ident) => {
        $crate::message::write_oneof(&$value, $out)
    };
    ($tag:literal, $value:expr, $name:expr, $out:ident) => {
        $crate::FieldValue::write(&$value, $name, $tag, $out)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __message_read {
    (oneof, $ty:ty, $record:ident, $name:expr) => {
        $crate::message::read_oneof($record).map_err(|e| e.at($name))?
    };
    ($tag:literal, $ty:ty, $record:ident, $name:expr) => {
        <$ty as $crate::FieldValue>::read($record, $name, $tag)?
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __first {
    ($first:expr $(, $rest:expr)*) => {
        $first
    };
}
