// Exit codes. Setup errors and verification mismatches share the failure
// code; stdout tells them apart.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
