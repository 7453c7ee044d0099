pub(crate) mod moc;
