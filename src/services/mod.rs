mod translator;

pub use translator::Translator;
