mod index_test;
