use heck::ToKebabCase;

/// Extension appended to type-derived configuration file names.
pub const CONFIG_EXTENSION: &str = "conf";

/// Leak a string into a `'static` lifetime. Used to build path literals at runtime.
pub fn leak_string(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

/// File name derived from a type name: `my::SampleConfig<T>` becomes
/// `sample-config.conf`.
pub fn file_name_for(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let base = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    format!("{}.{CONFIG_EXTENSION}", base.to_kebab_case())
}

/// [`file_name_for`] applied to `T`'s own name.
pub fn default_file_name<T: ?Sized>() -> String {
    file_name_for(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SampleConfig;
    struct HttpServerConfig<T>(T);

    #[test]
    fn derives_kebab_case_names() {
        assert_eq!(default_file_name::<SampleConfig>(), "sample-config.conf");
        assert_eq!(
            default_file_name::<HttpServerConfig<u8>>(),
            "http-server-config.conf"
        );
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(file_name_for("database"), "database.conf");
        assert_eq!(file_name_for("a::b::DB"), "db.conf");
    }
}
