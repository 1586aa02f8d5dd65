//! JVM type signatures as returned by `GetClassSignature` and used by
//! `GetFieldID`.
//!
//! | Signature              | Kind                      |
//! |------------------------|---------------------------|
//! | `I`, `Z`, `D`, ...     | primitive                 |
//! | `Ljava/lang/Object;`   | class or interface        |
//! | `[I`, `[[Ljava/...;`   | array of any of the above |

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    pub fn from_descriptor(c: char) -> Option<Primitive> {
        Some(match c {
            'Z' => Primitive::Boolean,
            'B' => Primitive::Byte,
            'C' => Primitive::Char,
            'S' => Primitive::Short,
            'I' => Primitive::Int,
            'J' => Primitive::Long,
            'F' => Primitive::Float,
            'D' => Primitive::Double,
            _ => return None,
        })
    }

    pub fn descriptor(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    Primitive(Primitive),
    /// Internal class name, e.g. `java/lang/Object`.
    Object(String),
    Array(Box<TypeSignature>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("empty signature")]
    Empty,
    #[error("unknown type descriptor `{0}`")]
    UnknownDescriptor(char),
    #[error("unterminated class signature `{0}`")]
    Unterminated(String),
    #[error("trailing characters in signature `{0}`")]
    Trailing(String),
}

impl TypeSignature {
    /// Parses exactly one field type signature.
    ///
    /// Class names are taken as-is between `L` and `;`, so hidden and
    /// lambda classes (`Lfoo/Bar$$Lambda+0x1234;`) are accepted.
    pub fn parse(sig: &str) -> Result<TypeSignature, SignatureError> {
        let (parsed, rest) = Self::parse_prefix(sig)?;
        if rest.is_empty() {
            Ok(parsed)
        } else {
            Err(SignatureError::Trailing(sig.to_string()))
        }
    }

    fn parse_prefix(sig: &str) -> Result<(TypeSignature, &str), SignatureError> {
        let mut chars = sig.chars();
        let first = chars.next().ok_or(SignatureError::Empty)?;
        let rest = chars.as_str();
        match first {
            '[' => {
                let (element, rest) = Self::parse_prefix(rest)?;
                Ok((TypeSignature::Array(Box::new(element)), rest))
            }
            'L' => match rest.find(';') {
                Some(end) if end > 0 => Ok((TypeSignature::Object(rest[..end].to_string()), &rest[end + 1..])),
                _ => Err(SignatureError::Unterminated(sig.to_string())),
            },
            c => Primitive::from_descriptor(c)
                .map(|p| (TypeSignature::Primitive(p), rest))
                .ok_or(SignatureError::UnknownDescriptor(c)),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeSignature::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeSignature::Array(_))
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Primitive(p) => write!(f, "{}", p.descriptor()),
            TypeSignature::Object(name) => write!(f, "L{};", name),
            TypeSignature::Array(element) => write!(f, "[{}", element),
        }
    }
}

/// `java/lang/Object` -> `Ljava/lang/Object;`
pub fn class_signature(internal_name: &str) -> String {
    format!("L{};", internal_name)
}

/// `Ljava/lang/Object;` -> `java/lang/Object`; `None` for anything else.
pub fn internal_name(signature: &str) -> Option<&str> {
    signature
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives() {
        for p in Primitive::ALL {
            let sig = p.descriptor().to_string();
            assert_eq!(TypeSignature::parse(&sig), Ok(TypeSignature::Primitive(p)));
        }
        assert_eq!(TypeSignature::parse("V"), Err(SignatureError::UnknownDescriptor('V')));
    }

    #[test]
    fn objects_and_arrays() {
        let sig = TypeSignature::parse("[Lnsk/jvmti/GetLoadedClasses/loadedclss002;").unwrap();
        assert!(sig.is_array());
        assert!(!sig.is_primitive());
        assert_eq!(sig.to_string(), "[Lnsk/jvmti/GetLoadedClasses/loadedclss002;");
        assert_eq!(
            TypeSignature::parse("[[D"),
            Ok(TypeSignature::Array(Box::new(TypeSignature::Array(Box::new(TypeSignature::Primitive(Primitive::Double))))))
        );
    }

    #[test]
    fn hidden_class_names_are_accepted() {
        let sig = TypeSignature::parse("Ljava/lang/invoke/LambdaForm$MH+0x0000000800c01000;").unwrap();
        assert!(matches!(sig, TypeSignature::Object(_)));
    }

    #[test]
    fn malformed() {
        assert_eq!(TypeSignature::parse(""), Err(SignatureError::Empty));
        assert!(matches!(TypeSignature::parse("Ljava/lang/Object"), Err(SignatureError::Unterminated(_))));
        assert!(matches!(TypeSignature::parse("L;"), Err(SignatureError::Unterminated(_))));
        assert!(matches!(TypeSignature::parse("II"), Err(SignatureError::Trailing(_))));
    }

    #[test]
    fn internal_names() {
        assert_eq!(internal_name("Ljava/lang/Object;"), Some("java/lang/Object"));
        assert_eq!(internal_name("[I"), None);
        assert_eq!(class_signature("java/lang/Object"), "Ljava/lang/Object;");
    }
}
