mod id_tests;
