/// Reset codes expire this long after issuance.
pub const RESET_CODE_TTL_SECS: u64 = 3600;

pub const APP_KEY_HEADER: &str = "X-App-Key";

pub mod messages {

    pub const MISSING_APP_KEY: &str = "Missing application key";

    pub const BAD_APP_KEY: &str = "Bad application key";

    /// Shared by wrong-password, unknown-principal and locked-out rejections.
    pub const BAD_CREDENTIALS: &str = "Bad credentials";

    pub const WRONG_PASSWORD: &str = "Wrong password";

    pub const WEAK_PASSWORD: &str = "Password must be 8-40 characters and contain at least three of: \
         lowercase letters, uppercase letters, digits, symbols";

    pub const PASSWORD_REUSED: &str = "Password was used recently, choose another one";

    pub const PASSWORD_MISMATCH: &str = "Passwords do not match";

    pub const EMAIL_NOT_FOUND: &str = "Email not found";

    pub const INVALID_CODE: &str = "Invalid code";

    pub const REQUIRED: &str = "This field is required";

    pub const USERNAME_TAKEN: &str = "Username already in use";

    pub const EMAIL_TAKEN: &str = "Email already in use";

    pub const UNKNOWN_ROLE: &str = "Unknown role";
}

pub mod fields {

    pub const PREVIOUS_PASSWORD: &str = "previous_password";

    pub const PASSWORD1: &str = "password1";

    pub const PASSWORD2: &str = "password2";

    pub const EMAIL: &str = "email";

    pub const CODE: &str = "code";

    pub const USERNAME: &str = "username";

    pub const ROLES: &str = "roles";
}

pub mod templates {

    pub const PASSWORD_RESET_CODE: &str = "password-reset-code";
}
