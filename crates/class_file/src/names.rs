/// Well-known attribute names whose UTF-8 index a writer caches on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeName {
    ConstantValue,
    Code,
    StackMapTable,
    BootstrapMethods,
    Exceptions,
    InnerClasses,
    Synthetic,
    Signature,
    SourceFile,
    LineNumberTable,
    LocalVariableTable,
    Deprecated,
    RuntimeVisibleAnnotations,
    RuntimeInvisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
    RuntimeInvisibleParameterAnnotations,
    RuntimeVisibleTypeAnnotations,
    RuntimeInvisibleTypeAnnotations,
    AnnotationDefault,
    MethodParameters,
}

impl AttributeName {
    pub const COUNT: usize = 20;

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeName::ConstantValue => "ConstantValue",
            AttributeName::Code => "Code",
            AttributeName::StackMapTable => "StackMapTable",
            AttributeName::BootstrapMethods => "BootstrapMethods",
            AttributeName::Exceptions => "Exceptions",
            AttributeName::InnerClasses => "InnerClasses",
            AttributeName::Synthetic => "Synthetic",
            AttributeName::Signature => "Signature",
            AttributeName::SourceFile => "SourceFile",
            AttributeName::LineNumberTable => "LineNumberTable",
            AttributeName::LocalVariableTable => "LocalVariableTable",
            AttributeName::Deprecated => "Deprecated",
            AttributeName::RuntimeVisibleAnnotations => "RuntimeVisibleAnnotations",
            AttributeName::RuntimeInvisibleAnnotations => "RuntimeInvisibleAnnotations",
            AttributeName::RuntimeVisibleParameterAnnotations => {
                "RuntimeVisibleParameterAnnotations"
            }
            AttributeName::RuntimeInvisibleParameterAnnotations => {
                "RuntimeInvisibleParameterAnnotations"
            }
            AttributeName::RuntimeVisibleTypeAnnotations => "RuntimeVisibleTypeAnnotations",
            AttributeName::RuntimeInvisibleTypeAnnotations => "RuntimeInvisibleTypeAnnotations",
            AttributeName::AnnotationDefault => "AnnotationDefault",
            AttributeName::MethodParameters => "MethodParameters",
        }
    }
}

/// Lazily filled table of attribute name indexes, `0` meaning not interned yet.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameCache([u16; AttributeName::COUNT]);

impl NameCache {
    pub(crate) fn get(&self, name: AttributeName) -> Option<u16> {
        match self.0[name as usize] {
            0 => None,
            index => Some(index),
        }
    }

    pub(crate) fn insert(&mut self, name: AttributeName, index: u16) {
        self.0[name as usize] = index;
    }
}
