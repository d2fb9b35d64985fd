/*!
 Errors that can happen while decoding or encoding keyed archives.
*/

pub mod archiver;
pub mod decode;
pub mod encode;
pub mod validation;
