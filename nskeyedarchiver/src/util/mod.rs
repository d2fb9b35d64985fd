/*!
 This module defines common utilities used by the archiver.
*/

pub mod dates;
pub mod json;
pub mod options;
pub mod plist;
