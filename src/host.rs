//! Host name and current user lookup.

/// Fallback when no user name can be resolved.
pub const UNKNOWN_USER: &str = "unknown";

/// Name of the machine, or an empty string when it cannot be read.
pub fn hostname() -> String {
    os_hostname().unwrap_or_default()
}

/// Resolve the current user name from the OS, then `USER`, then `USERNAME`.
pub fn current_username() -> String {
    resolve_username(os_username(), |key| std::env::var(key).ok())
}

/// Pick the first non-empty candidate, falling back to [`UNKNOWN_USER`].
pub fn resolve_username<F>(os_user: Option<String>, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    os_user
        .into_iter()
        .chain(env("USER"))
        .chain(env("USERNAME"))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

#[cfg(unix)]
fn os_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).ok()
}

#[cfg(not(unix))]
fn os_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(unix)]
fn os_username() -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: passwd is plain old data; getpwuid_r fills it in.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // SAFETY: every pointer references a live local of the advertised size.
    let rc = unsafe {
        libc::getpwuid_r(
            libc::getuid(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
        return None;
    }

    // SAFETY: pw_name points into buf and is NUL-terminated on success.
    let name = unsafe { std::ffi::CStr::from_ptr(pwd.pw_name) };
    name.to_str().ok().map(str::to_owned)
}

#[cfg(not(unix))]
fn os_username() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_os_user_wins() {
        let name = resolve_username(Some("root".into()), env_of(&[("USER", "alice")]));
        assert_eq!(name, "root");
    }

    #[test]
    fn test_user_env_when_no_os_user() {
        let name = resolve_username(None, env_of(&[("USER", "alice")]));
        assert_eq!(name, "alice");
    }

    #[test]
    fn test_username_env_after_user() {
        let name = resolve_username(None, env_of(&[("USERNAME", "bob")]));
        assert_eq!(name, "bob");
    }

    #[test]
    fn test_empty_values_skipped() {
        let name = resolve_username(
            Some(String::new()),
            env_of(&[("USER", ""), ("USERNAME", "carol")]),
        );
        assert_eq!(name, "carol");
    }

    #[test]
    fn test_unknown_when_nothing_resolves() {
        assert_eq!(resolve_username(None, env_of(&[])), UNKNOWN_USER);
    }

    #[cfg(unix)]
    #[test]
    fn test_hostname_is_readable() {
        assert!(!hostname().is_empty());
    }
}
