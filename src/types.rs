/// Storage files hold double precision values.
pub type Float = f64;
