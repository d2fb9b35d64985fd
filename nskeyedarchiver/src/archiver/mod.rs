/*!
 Contains logic and data structures used to decode and encode `NSKeyedArchiver` data.

 ## Overview

 `NSKeyedArchiver` flattens an `Objective-C` object graph into a property list. Every object is
 stored once in the `$objects` table and referred to by its index, so shared and cyclic
 references survive serialization. Composite objects carry a `$class` reference to a descriptor
 naming their class hierarchy.

 ## Pipeline

 - [`envelope`] checks the four top-level keys
 - [`resolver`] walks `$objects`, handing each entry to [`reconstructor`], which dispatches on
   the [`classes`] table
 - [`flattener`] performs the inverse, building a new `$objects` table from [`models::Value`]s
 - [`codec`] wires both directions to the property list byte formats
*/

pub mod classes;
pub mod codec;
pub mod envelope;
pub mod flattener;
pub mod models;
pub mod reconstructor;
pub mod resolver;
mod tests;
