/// Defines an opaque 128-bit identifier backed by a UUID, with `Display`,
/// `FromStr`, and human-readable `serde` support (serialized as the UUID's
/// string form, not as a raw byte array, since every wire format in this
/// system is JSON).
macro_rules! define_uuid_id {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generates a fresh, random identifier.
            ///
            /// Only ingestion is supposed to call this; the consumer never
            /// invents an id, it only ever applies the one carried on the
            /// event.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            pub fn from_uuid(inner: uuid::Uuid) -> Self {
                Self(inner)
            }

            pub fn into_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(inner: uuid::Uuid) -> Self {
                Self(inner)
            }
        }
    };
}

pub(crate) use define_uuid_id;
