//! Service shared access signature construction.
//!
//! A [`DelegationToken`] describes everything a signature commits to: which
//! container (and optionally which blob) it reaches, what it may do there,
//! from where, and for how long. The token is signed with an account key to
//! produce the query string appended to a blob or container URL.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::MintError;

/// Storage service version the signature is computed for.
pub const SAS_VERSION: &str = "2021-08-06";

/// Minutes before issuance a token becomes valid.
pub const SKEW_ALLOWANCE_MINUTES: i64 = 10;

/// Minutes after issuance a token remains valid.
pub const LIFETIME_MINUTES: i64 = 20;

/// Timestamp format used by `st` and `se`.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Permission granted by a token. A token always carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read the content of a single blob.
    Read,
    /// Enumerate the blobs of a container.
    List,
}

impl Permission {
    /// Get the permission letter used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "r",
            Permission::List => "l",
        }
    }
}

/// What a token reaches inside the tenant's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Read one named blob.
    Read {
        /// Blob name within the container.
        object: String,
    },
    /// List the whole container.
    List,
}

impl Scope {
    /// The single permission this scope grants.
    pub fn permission(&self) -> Permission {
        match self {
            Scope::Read { .. } => Permission::Read,
            Scope::List => Permission::List,
        }
    }

    /// The blob this scope is limited to, if any.
    pub fn object(&self) -> Option<&str> {
        match self {
            Scope::Read { object } => Some(object),
            Scope::List => None,
        }
    }

    fn resource(&self) -> &'static str {
        match self {
            Scope::Read { .. } => "b",
            Scope::List => "c",
        }
    }
}

/// Network origin a token may be presented from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// No address restriction.
    Any,
    /// Exactly one client address.
    Address(IpAddr),
}

impl Origin {
    /// Parse a client address.
    pub fn parse(value: &str) -> Result<Self, MintError> {
        value
            .trim()
            .parse::<IpAddr>()
            .map(Origin::Address)
            .map_err(|_| MintError::InvalidOrigin(value.to_string()))
    }

    fn as_sip(&self) -> Option<String> {
        match self {
            Origin::Any => None,
            Origin::Address(ip) => Some(ip.to_string()),
        }
    }
}

impl From<IpAddr> for Origin {
    fn from(ip: IpAddr) -> Self {
        Origin::Address(ip)
    }
}

/// Protocols a token may be used over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// HTTPS only.
    Https,
    /// HTTPS or plain HTTP, for emulators served without TLS.
    HttpsAndHttp,
}

impl Protocol {
    /// Pick the protocol restriction matching an endpoint scheme.
    pub fn for_scheme(scheme: &str) -> Self {
        if scheme.eq_ignore_ascii_case("https") {
            Protocol::Https
        } else {
            Protocol::HttpsAndHttp
        }
    }

    /// Get the protocol value used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::HttpsAndHttp => "https,http",
        }
    }
}

/// The unsigned content of a shared access signature.
///
/// Validity is fixed at construction: the token starts ten minutes before
/// the issuance time and expires twenty minutes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationToken {
    partition: String,
    scope: Scope,
    origin: Origin,
    protocol: Protocol,
    issued_at: DateTime<Utc>,
    starts_on: DateTime<Utc>,
    expires_on: DateTime<Utc>,
}

impl DelegationToken {
    /// Create a token for one container, issued at `issued_at`.
    ///
    /// Sub-second precision is dropped since the wire format carries whole
    /// seconds only.
    pub fn new(
        partition: impl Into<String>,
        scope: Scope,
        origin: Origin,
        protocol: Protocol,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let issued_at = issued_at.trunc_subsecs(0);
        Self {
            partition: partition.into(),
            scope,
            origin,
            protocol,
            issued_at,
            starts_on: issued_at - Duration::minutes(SKEW_ALLOWANCE_MINUTES),
            expires_on: issued_at + Duration::minutes(LIFETIME_MINUTES),
        }
    }

    /// Container the token is limited to.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// What the token reaches.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The single permission granted.
    pub fn permission(&self) -> Permission {
        self.scope.permission()
    }

    /// Blob the token is limited to, if any.
    pub fn object(&self) -> Option<&str> {
        self.scope.object()
    }

    /// Address the token may be presented from.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Protocols the token may be used over.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Issuance time, truncated to whole seconds.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Start of the validity window.
    pub fn starts_on(&self) -> DateTime<Utc> {
        self.starts_on
    }

    /// End of the validity window.
    pub fn expires_on(&self) -> DateTime<Utc> {
        self.expires_on
    }

    fn canonicalized_resource(&self, account: &str) -> String {
        match self.scope.object() {
            Some(object) => format!("/blob/{}/{}/{}", account, self.partition, object),
            None => format!("/blob/{}/{}", account, self.partition),
        }
    }

    /// Build the string the account key signs.
    pub fn string_to_sign(&self, account: &str) -> String {
        let starts_on = self.starts_on.format(TIME_FORMAT).to_string();
        let expires_on = self.expires_on.format(TIME_FORMAT).to_string();
        let sip = self.origin.as_sip().unwrap_or_default();
        [
            self.permission().as_str(),
            starts_on.as_str(),
            expires_on.as_str(),
            self.canonicalized_resource(account).as_str(),
            // signed identifier
            "",
            sip.as_str(),
            self.protocol.as_str(),
            SAS_VERSION,
            self.scope.resource(),
            // snapshot time
            "",
            // encryption scope
            "",
            // rscc, rscd, rsce, rscl, rsct
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n")
    }

    /// Query parameters carrying this token and its signature.
    pub fn query(&self, signature: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("sv", SAS_VERSION.to_string()),
            ("spr", self.protocol.as_str().to_string()),
            ("st", self.starts_on.format(TIME_FORMAT).to_string()),
            ("se", self.expires_on.format(TIME_FORMAT).to_string()),
            ("sr", self.scope.resource().to_string()),
            ("sp", self.permission().as_str().to_string()),
        ];
        if let Some(sip) = self.origin.as_sip() {
            query.push(("sip", sip));
        }
        query.push(("sig", signature.to_string()));
        query
    }
}

impl fmt::Display for DelegationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{} until {}",
            self.permission().as_str(),
            self.partition,
            self.object().map(|o| format!("/{}", o)).unwrap_or_default(),
            self.expires_on.format(TIME_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn read_token() -> DelegationToken {
        DelegationToken::new(
            "clienta",
            Scope::Read {
                object: "report.csv".into(),
            },
            Origin::parse("203.0.113.7").unwrap(),
            Protocol::Https,
            issued(),
        )
    }

    #[test]
    fn it_brackets_issuance_with_thirty_minute_window() {
        let token = read_token();

        assert!(token.starts_on() <= token.issued_at());
        assert!(token.issued_at() <= token.expires_on());
        assert_eq!(token.expires_on() - token.starts_on(), Duration::minutes(30));
        assert_eq!(token.issued_at() - token.starts_on(), Duration::minutes(10));
    }

    #[test]
    fn it_truncates_subsecond_issuance() {
        let issued_at = issued() + Duration::milliseconds(750);
        let token = DelegationToken::new("c", Scope::List, Origin::Any, Protocol::Https, issued_at);

        assert_eq!(token.issued_at(), issued());
        assert_eq!(token.expires_on() - token.starts_on(), Duration::minutes(30));
    }

    #[test]
    fn it_builds_read_string_to_sign() {
        let token = read_token();

        let expected = "r\n\
            2024-03-01T11:50:00Z\n\
            2024-03-01T12:20:00Z\n\
            /blob/myaccount/clienta/report.csv\n\
            \n\
            203.0.113.7\n\
            https\n\
            2021-08-06\n\
            b\n\
            \n\
            \n\
            \n\
            \n\
            \n\
            \n";

        assert_eq!(token.string_to_sign("myaccount"), expected);
    }

    #[test]
    fn it_builds_list_string_to_sign_without_object() {
        let token = DelegationToken::new(
            "clienta",
            Scope::List,
            Origin::Any,
            Protocol::HttpsAndHttp,
            issued(),
        );

        let string_to_sign = token.string_to_sign("myaccount");
        let lines: Vec<&str> = string_to_sign.split('\n').collect();

        assert_eq!(lines.len(), 16);
        assert_eq!(lines[0], "l");
        assert_eq!(lines[3], "/blob/myaccount/clienta");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "https,http");
        assert_eq!(lines[8], "c");
    }

    #[test]
    fn it_never_pairs_list_with_object() {
        let token = DelegationToken::new("clienta", Scope::List, Origin::Any, Protocol::Https, issued());

        assert_eq!(token.permission(), Permission::List);
        assert_eq!(token.object(), None);
    }

    #[test]
    fn it_limits_read_to_one_object() {
        let token = read_token();

        assert_eq!(token.permission(), Permission::Read);
        assert_eq!(token.object(), Some("report.csv"));
    }

    #[test]
    fn it_omits_sip_for_unrestricted_origin() {
        let token = DelegationToken::new("clienta", Scope::List, Origin::Any, Protocol::Https, issued());
        let query = token.query("c2ln");

        assert!(query.iter().all(|(k, _)| *k != "sip"));
        assert_eq!(query.last(), Some(&("sig", "c2ln".to_string())));
    }

    #[test]
    fn it_includes_sip_for_restricted_origin() {
        let query = read_token().query("c2ln");

        assert!(query.contains(&("sip", "203.0.113.7".to_string())));
        assert!(query.contains(&("sr", "b".to_string())));
        assert!(query.contains(&("sp", "r".to_string())));
        assert!(query.contains(&("st", "2024-03-01T11:50:00Z".to_string())));
        assert!(query.contains(&("se", "2024-03-01T12:20:00Z".to_string())));
    }

    #[test]
    fn it_accepts_ipv6_origin() {
        let origin = Origin::parse("2001:db8::1").unwrap();
        assert_eq!(origin, Origin::Address("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn it_rejects_malformed_origin() {
        assert!(matches!(
            Origin::parse("not-an-ip"),
            Err(MintError::InvalidOrigin(_))
        ));
        assert!(matches!(
            Origin::parse("203.0.113.7, 10.0.0.1"),
            Err(MintError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn it_derives_protocol_from_scheme() {
        assert_eq!(Protocol::for_scheme("https"), Protocol::Https);
        assert_eq!(Protocol::for_scheme("http"), Protocol::HttpsAndHttp);
    }
}
