mod test_flattener;
mod test_unarchive;
