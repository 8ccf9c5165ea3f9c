pub use brew_class_file as class_file;
pub use brew_rename as rename;
