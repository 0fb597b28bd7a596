// Program resolution and origin trust.
//
// Requests arrive from five program sites sharing one auth backend. The
// serving program is derived from the request's origin host rather than
// trusted from the caller: localhost resolves by dev port, everything
// else by registrable domain. Redirect targets are only honored when
// their origin is on the exact-match trust list.

use url::Url;
use vcorp_core::options::VcorpOptions;
use vcorp_core::program::ProgramId;

/// Resolve the serving program from an origin or referer URL.
pub fn resolve_program_from_origin(options: &VcorpOptions, origin: &str) -> Option<ProgramId> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;

    if host == "localhost" || host == "127.0.0.1" {
        let port = url.port()?;
        return options.resolution.port_programs.get(&port).copied();
    }

    // Strip a leading "www." so both apex and www resolve.
    let domain = host.strip_prefix("www.").unwrap_or(host);
    options.resolution.domain_programs.get(domain).copied()
}

/// Resolve the serving program, preferring the request origin and falling
/// back to an explicit program parameter only when no origin resolves.
pub fn resolve_program(
    options: &VcorpOptions,
    origin: Option<&str>,
    explicit: Option<&str>,
) -> Option<ProgramId> {
    origin
        .and_then(|o| resolve_program_from_origin(options, o))
        .or_else(|| explicit.and_then(ProgramId::parse))
}

/// Whether an origin is on the trust list. Exact match only.
pub fn is_origin_trusted(options: &VcorpOptions, origin: &str) -> bool {
    options.trusted_origins.iter().any(|o| o == origin)
}

/// Validate a redirect target: its origin must be trusted. Returns the
/// URL unchanged when acceptable, None otherwise. Relative paths are
/// rejected — callers always supply absolute program-site URLs.
pub fn sanitize_redirect<'a>(options: &VcorpOptions, redirect: &'a str) -> Option<&'a str> {
    let url = Url::parse(redirect).ok()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str()?, port),
        None => format!("{}://{}", url.scheme(), url.host_str()?),
    };
    if is_origin_trusted(options, &origin) {
        Some(redirect)
    } else {
        None
    }
}
