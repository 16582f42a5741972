mod resolver;

pub use resolver::LibraryResolver;
